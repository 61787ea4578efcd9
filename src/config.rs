//! Application configuration
//!
//! All knobs come from the environment. `DATABASE_URL` and `SECRET_KEY` are
//! mandatory; a missing one aborts startup with a non-zero exit code.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Application configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub secret_key: String,
    pub app_env: String,

    pub api_host: String,
    pub api_port: u16,
    pub ocpp_ws_port: u16,

    /// When `true` stations must present a valid API key on connect.
    pub verify_station_api_keys: bool,
    /// Bootstrap key accepted for any station (empty = disabled).
    pub station_master_api_key: String,

    /// Availability sweeper cadence.
    pub status_check_interval_seconds: u64,
    /// Idempotency-record purge cadence.
    pub cleanup_interval_minutes: u64,
    pub qr_code_lifetime_minutes: u64,
    pub invoice_lifetime_minutes: u64,

    pub rate_limit_default_per_minute: u32,
    pub rate_limit_critical_per_minute: u32,
    pub rate_limit_webhook_per_minute: u32,

    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            secret_key: require("SECRET_KEY")?,
            app_env: env_or("APP_ENV", "development"),

            api_host: env_or("APP_HOST", "0.0.0.0"),
            api_port: parse_or("APP_PORT", 8180)?,
            ocpp_ws_port: parse_or("OCPP_WS_PORT", 9000)?,

            verify_station_api_keys: bool_or("VERIFY_STATION_API_KEYS", true),
            station_master_api_key: env_or("STATION_MASTER_API_KEY", ""),

            status_check_interval_seconds: parse_or("STATUS_CHECK_INTERVAL_SECONDS", 60)?,
            cleanup_interval_minutes: parse_or("CLEANUP_INTERVAL_MINUTES", 5)?,
            qr_code_lifetime_minutes: parse_or("QR_CODE_LIFETIME_MINUTES", 5)?,
            invoice_lifetime_minutes: parse_or("INVOICE_LIFETIME_MINUTES", 10)?,

            rate_limit_default_per_minute: parse_or("RATE_LIMIT_DEFAULT_PER_MINUTE", 60)?,
            rate_limit_critical_per_minute: parse_or("RATE_LIMIT_CRITICAL_PER_MINUTE", 10)?,
            rate_limit_webhook_per_minute: parse_or("RATE_LIMIT_WEBHOOK_PER_MINUTE", 30)?,

            log_level: env_or("LOG_LEVEL", "info"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn ws_address(&self) -> String {
        format!("{}:{}", self.api_host, self.ocpp_ws_port)
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn bool_or(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(v) => v.parse().map_err(|_| ConfigError::InvalidVar {
            var,
            value: v.clone(),
        }),
        Err(_) => Ok(default),
    }
}
