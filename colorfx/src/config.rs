use anyhow::{Context, Result, bail};
use color_engine::ColorEffect;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

#[derive(Serialize, Deserialize, Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct Config {
    #[derivative(Default(value = "\"0.0.0.0\".to_string()"))]
    pub address: String,

    #[derivative(Default(value = "5000"))]
    pub port: u16,

    #[derivative(Default(value = "PathBuf::from(\"temp\")"))]
    pub upload_dir: PathBuf,

    #[derivative(Default(value = "allowed_extensions_default()"))]
    pub allowed_extensions: Vec<String>,

    #[derivative(Default(value = "95"))]
    pub jpeg_quality: u8,

    // bytes
    #[derivative(Default(value = "16 * 1024 * 1024"))]
    pub max_body_size: usize,

    // milliseconds allowed for reading a whole request
    #[derivative(Default(value = "30_000"))]
    pub read_timeout_ms: u64,

    #[derivative(Default(value = "\"enhance\".to_string()"))]
    pub default_effect: String,
}

fn allowed_extensions_default() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Loads the TOML file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("read config file {} failed", path.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("parse config file {} failed", path.display()))?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.allowed_extensions = config
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!("jpeg_quality must be in 1..=100, got {}", self.jpeg_quality);
        }

        if self.read_timeout_ms == 0 {
            bail!("read_timeout_ms must be greater than 0");
        }

        if self.allowed_extensions.is_empty() {
            bail!("allowed_extensions must not be empty");
        }

        self.default_effect()?;
        Ok(())
    }

    pub fn default_effect(&self) -> Result<ColorEffect> {
        self.default_effect
            .parse::<ColorEffect>()
            .with_context(|| format!("invalid default_effect `{}`", self.default_effect))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Creates the upload directory if it does not exist yet.
    pub fn prepare_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.upload_dir)
            .with_context(|| format!("create upload dir {} failed", self.upload_dir.display()))
    }
}
