//! Server configuration.
//!
//! This module provides configuration management for the picodb server:
//! defaults, a builder, and TOML file round-trips.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Data directory. Accepted for compatibility; the engine keeps all
    /// state in memory and does not touch it.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seconds between compaction timer ticks. The tick is a placeholder
    /// hook with no effect.
    #[serde(default = "default_compact_every")]
    pub compact_every_secs: u64,

    /// Maximum number of concurrent client connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Maximum outstanding query requests. Sizes the engine's request
    /// queue, and — scaled by two — its worker pool.
    #[serde(default = "default_max_db_requests")]
    pub max_db_requests: usize,

    /// Query timeout in seconds, enforced at the network boundary.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_compact_every() -> u64 {
    60
}

fn default_max_connections() -> usize {
    10
}

fn default_max_db_requests() -> usize {
    10
}

fn default_query_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            compact_every_secs: default_compact_every(),
            max_connections: default_max_connections(),
            max_db_requests: default_max_db_requests(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

impl ServerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the socket address to bind.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Creates a builder for configuration.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }
}

/// Builder for server configuration.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the data directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Sets the compaction tick interval in seconds.
    pub fn compact_every_secs(mut self, secs: u64) -> Self {
        self.config.compact_every_secs = secs;
        self
    }

    /// Sets the maximum number of client connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Sets the maximum number of outstanding query requests.
    pub fn max_db_requests(mut self, max: usize) -> Self {
        self.config.max_db_requests = max;
        self
    }

    /// Sets the query timeout in seconds.
    pub fn query_timeout_secs(mut self, secs: u64) -> Self {
        self.config.query_timeout_secs = secs;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
