//! Back-office configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults, so a bare `KARAT_DB_PATH=./karat.db` is enough to run.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use karat_core::MAX_UPCOMING_WINDOW_DAYS;

/// Back-office configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackofficeConfig {
    /// Path to the SQLite database file.
    pub database_path: String,

    /// Maximum database connections.
    pub db_max_connections: u32,

    /// Tracing filter directive, e.g. "info" or "karat_store=debug".
    pub log_filter: String,

    /// Cap applied to the upcoming-installments window, in days.
    pub upcoming_window_cap_days: i64,
}

impl BackofficeConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = BackofficeConfig {
            database_path: env::var("KARAT_DB_PATH")
                .unwrap_or_else(|_| "./karat.db".to_string()),

            db_max_connections: env::var("KARAT_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KARAT_DB_MAX_CONNECTIONS".to_string()))?,

            log_filter: env::var("KARAT_LOG").unwrap_or_else(|_| "info".to_string()),

            upcoming_window_cap_days: env::var("KARAT_UPCOMING_WINDOW_CAP_DAYS")
                .unwrap_or_else(|_| MAX_UPCOMING_WINDOW_DAYS.to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("KARAT_UPCOMING_WINDOW_CAP_DAYS".to_string())
                })?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "KARAT_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.upcoming_window_cap_days < 1
            || config.upcoming_window_cap_days > MAX_UPCOMING_WINDOW_DAYS
        {
            return Err(ConfigError::InvalidValue(
                "KARAT_UPCOMING_WINDOW_CAP_DAYS".to_string(),
            ));
        }

        Ok(config)
    }
}

impl Default for BackofficeConfig {
    fn default() -> Self {
        BackofficeConfig {
            database_path: "./karat.db".to_string(),
            db_max_connections: 5,
            log_filter: "info".to_string(),
            upcoming_window_cap_days: MAX_UPCOMING_WINDOW_DAYS,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackofficeConfig::default();
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.upcoming_window_cap_days, MAX_UPCOMING_WINDOW_DAYS);
        assert_eq!(config.log_filter, "info");
    }
}
