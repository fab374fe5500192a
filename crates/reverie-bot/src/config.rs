//! Environment-driven configuration.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingVar(&'static str),
}

pub struct BotConfig {
    pub telegram_token: String,
    pub db_path: PathBuf,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingVar("TELEGRAM_BOT_TOKEN"))?;
        let db_path = std::env::var("REVERIE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("reverie.sqlite3"));
        Ok(Self {
            telegram_token,
            db_path,
        })
    }
}
