//! Server configuration.
//!
//! Values are layered, later sources winning:
//! 1. Built-in defaults
//! 2. TOML file (`switchboard.toml` in the working directory, or `--config PATH`)
//! 3. Environment variables prefixed with `SWITCHBOARD__`, e.g. `SWITCHBOARD__BIND_ADDR`
//! 4. Command line flags (applied by `main`)

use std::net::SocketAddr;
use std::path::Path;

use clap::ValueEnum;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use switchboard_registry::{DuplicatePolicy, RegistryConfig};

/// Config file looked up when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "switchboard.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SWITCHBOARD";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable, multi-line
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Main server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to
    pub bind_addr: SocketAddr,
    /// Per-connection outbound queue size
    pub outbound_queue_capacity: usize,
    /// Relay text frames received from a client to every connection
    pub relay_inbound: bool,
    /// Seconds between sweeps for closed connections (0 disables)
    pub prune_interval_secs: u64,
    /// Policy for two connections mapping to the same short id
    pub duplicate_short_id: DuplicatePolicy,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            outbound_queue_capacity: 256,
            relay_inbound: true,
            prune_interval_secs: 30,
            duplicate_short_id: DuplicatePolicy::LastWriteWins,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: Self = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "outbound_queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Registry settings derived from this configuration.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            duplicate_short_id: self.duplicate_short_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert!(config.relay_inbound);
        assert_eq!(config.registry_config(), RegistryConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
bind_addr = "127.0.0.1:4000"
outbound_queue_capacity = 8
relay_inbound = false
duplicate_short_id = "reject"
log_format = "json"
"#
        )
        .unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.outbound_queue_capacity, 8);
        assert!(!config.relay_inbound);
        assert_eq!(config.prune_interval_secs, 30);
        assert_eq!(config.duplicate_short_id, DuplicatePolicy::Reject);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ServerConfig::load(Some(Path::new("/nonexistent/switchboard.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "outbound_queue_capacity = 0").unwrap();

        assert!(ServerConfig::load(Some(file.path())).is_err());
    }
}
