//! Configuration management.

use serde::Deserialize;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Datastore configuration
    #[serde(default)]
    pub datastore: DatastoreConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreConfig {
    /// Maximum attempts for an entity-group transaction before surfacing a conflict
    #[serde(default = "default_transaction_max_attempts")]
    pub transaction_max_attempts: u32,

    /// Base delay between transaction retries (doubles per attempt)
    #[serde(default = "default_transaction_retry_delay", with = "humantime_serde")]
    pub transaction_retry_delay: Duration,

    /// Upper bound on the per-attempt retry delay
    #[serde(default = "default_transaction_retry_delay_cap", with = "humantime_serde")]
    pub transaction_retry_delay_cap: Duration,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            transaction_max_attempts: default_transaction_max_attempts(),
            transaction_retry_delay: default_transaction_retry_delay(),
            transaction_retry_delay_cap: default_transaction_retry_delay_cap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter (overridden by RUST_LOG when set)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_transaction_max_attempts() -> u32 { 5 }
fn default_transaction_retry_delay() -> Duration { Duration::from_millis(10) }
fn default_transaction_retry_delay_cap() -> Duration { Duration::from_millis(250) }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CONFERENCE").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CONFERENCE").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.datastore.transaction_max_attempts, 5);
        assert_eq!(cfg.datastore.transaction_retry_delay, Duration::from_millis(10));
        assert!(cfg.datastore.transaction_retry_delay_cap >= cfg.datastore.transaction_retry_delay);
    }
}
