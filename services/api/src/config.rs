//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub auto_attendance_interval: Duration,
    pub digest_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: String::new(),
            log_level: Level::INFO,
            uploads_dir: PathBuf::from("./uploads"),
            max_upload_bytes: 5 * 1024 * 1024,
            cors_origin: "http://localhost:3000".to_string(),
            openai_api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            auto_attendance_interval: Duration::from_secs(60 * 60),
            digest_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Config::default();

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", defaults.bind_address)?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upload Settings ---
        let uploads_dir = std::env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.uploads_dir);
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;
        let cors_origin = std::env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let chat_model = std::env::var("CHAT_MODEL").unwrap_or(defaults.chat_model);

        // --- Load Job Intervals ---
        let sweep_minutes: u64 = parse_var("AUTO_ATTENDANCE_INTERVAL_MINUTES", 60)?;
        let digest_hours: u64 = parse_var("DIGEST_INTERVAL_HOURS", 24)?;
        if sweep_minutes == 0 || digest_hours == 0 {
            return Err(ConfigError::InvalidValue(
                "AUTO_ATTENDANCE_INTERVAL_MINUTES/DIGEST_INTERVAL_HOURS".to_string(),
                "intervals must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            uploads_dir,
            max_upload_bytes,
            cors_origin,
            openai_api_key,
            chat_model,
            auto_attendance_interval: Duration::from_secs(sweep_minutes * 60),
            digest_interval: Duration::from_secs(digest_hours * 60 * 60),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_and_rejects_garbage() {
        assert_eq!(parse_var::<usize>("ATTENDANCE_TEST_UNSET_VAR", 7).unwrap(), 7);

        std::env::set_var("ATTENDANCE_TEST_BAD_NUMBER", "lots");
        let err = parse_var::<usize>("ATTENDANCE_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "ATTENDANCE_TEST_BAD_NUMBER"));
    }
}
