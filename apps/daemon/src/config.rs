use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the persistent store file.
    pub data_dir: PathBuf,
    /// Directory where generated artifacts are saved.
    pub download_dir: PathBuf,
    /// Remote generation endpoint (multipart POST).
    pub generator_url: String,
    pub port: u16,
    pub rust_log: String,
    pub backup_interval: Duration,
    pub reconcile_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            data_dir: PathBuf::from(require_env("TAILOR_DATA_DIR")?),
            download_dir: PathBuf::from(require_env("TAILOR_DOWNLOAD_DIR")?),
            generator_url: require_env("GENERATOR_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            backup_interval: Duration::from_secs(
                std::env::var("BACKUP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse::<u64>()
                    .context("BACKUP_INTERVAL_SECS must be a number of seconds")?,
            ),
            reconcile_interval: Duration::from_secs(
                std::env::var("RECONCILE_INTERVAL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse::<u64>()
                    .context("RECONCILE_INTERVAL_SECS must be a number of seconds")?,
            ),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
