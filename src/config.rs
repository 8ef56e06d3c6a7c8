//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// How long a request waits for a pooled connection
    pub database_acquire_timeout: Duration,

    /// Per-statement timeout applied to every connection
    pub database_statement_timeout: Duration,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// HMAC secret identity tokens are signed with
    pub token_secret: String,

    /// Attempts to claim a fresh account number before giving up
    pub account_create_max_retries: u32,

    /// Interval of the stuck-lock report; `None` disables it
    pub stuck_lock_scan_interval: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let token_secret = required("TOKEN_SECRET")?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;
        let acquire_secs: u64 = parse_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?;
        let statement_ms: u64 = parse_or("DATABASE_STATEMENT_TIMEOUT_MS", 5000)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("PORT", 8070)?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let account_create_max_retries: u32 = parse_or("ACCOUNT_CREATE_MAX_RETRIES", 3)?;
        if account_create_max_retries == 0 {
            return Err(ConfigError::InvalidValue("ACCOUNT_CREATE_MAX_RETRIES"));
        }

        let scan_secs: u64 = parse_or("STUCK_LOCK_SCAN_SECS", 60)?;
        let stuck_lock_scan_interval = (scan_secs > 0).then(|| Duration::from_secs(scan_secs));

        Ok(Self {
            database_url,
            database_max_connections,
            database_acquire_timeout: Duration::from_secs(acquire_secs),
            database_statement_timeout: Duration::from_millis(statement_ms),
            host,
            port,
            environment,
            token_secret,
            account_create_max_retries,
            stuck_lock_scan_interval,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Socket address string the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(key)),
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
