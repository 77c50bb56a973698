//! Photo color processing service
//!
//! Accepts an uploaded image together with an effect name, runs it through
//! [`color_engine`] and answers with the JPEG result encoded as base64 JSON.
//!
//! # Routes
//! - `GET /`: service status and the list of effects
//! - `POST /process`: `multipart/form-data` upload (`image` file, optional `effect`)
//! - `POST /process-url`: JSON body `{"image_data": ..., "effect": ...}`

#[macro_use]
extern crate derivative;

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod multipart;
pub mod protocol;
pub mod server;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use server::ColorServer;

/// Initializes the logger.
///
/// Log lines look like `[12:30:05 INFO server.rs 42] message`.
pub fn init_logger() {
    use std::io::Write;

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let ts = chrono::Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "[{} {style}{}{style:#} {} {}] {}",
                ts,
                record.level(),
                record
                    .file()
                    .unwrap_or("None")
                    .split('/')
                    .next_back()
                    .unwrap_or("None"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}
