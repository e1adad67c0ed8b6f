//! Server configuration
//!
//! Defaults here, overridden by CLI flags and environment variables in
//! `main`. All knobs a deployment actually turns are exposed; everything
//! else is fixed by the platform contract.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ledgerpay_db::DatabaseConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub jobs: JobSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseConfig::default(),
            jobs: JobSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Grace period for in-flight requests on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    10
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Background job cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Leaderboard aggregation interval
    #[serde(default = "default_aggregate_interval")]
    pub aggregate_interval_secs: u64,

    /// Snapshot computation interval
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,

    /// Disable all background workers (API-only instance)
    #[serde(default)]
    pub disable_workers: bool,
}

fn default_aggregate_interval() -> u64 {
    5 * 60
}

fn default_snapshot_interval() -> u64 {
    10 * 60
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            aggregate_interval_secs: default_aggregate_interval(),
            snapshot_interval_secs: default_snapshot_interval(),
            disable_workers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace | debug | info | warn | error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// pretty | json
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.jobs.aggregate_interval_secs, 300);
        assert_eq!(config.jobs.snapshot_interval_secs, 600);
        assert!(config.server.socket_addr().is_ok());
    }
}
