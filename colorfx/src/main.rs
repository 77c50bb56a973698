use anyhow::{Context, Result};
use clap::Parser;
use colorfx::{ColorServer, Config};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Notify;

#[derive(Parser, Debug)]
#[command(version, about = "Photo color processing service")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    address: Option<String>,

    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// JPEG quality of processed images (1-100)
    #[arg(long)]
    jpeg_quality: Option<u8>,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(upload_dir) = self.upload_dir {
            config.upload_dir = upload_dir;
        }
        if let Some(quality) = self.jpeg_quality {
            config.jpeg_quality = quality;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    colorfx::init_logger();

    let config = Cli::parse().into_config()?;
    config.prepare_dirs()?;
    log::debug!("{config:?}");

    let exit_notify = Arc::new(Notify::new());
    let notify = exit_notify.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(_) => {
                log::info!("received ctrl-c, shutting down");
                notify.notify_one();
            }
            Err(e) => log::warn!("listen for ctrl-c failed: {e}"),
        }
    });

    ColorServer::new(config, exit_notify)
        .run()
        .await
        .context("colorfx server failed")
}
