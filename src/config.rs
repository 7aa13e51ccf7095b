//! Server configuration
//!
//! Passed explicitly to [`crate::listener::serve`]; nothing here is global.
//! Every field has a default, so an empty TOML document is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:12345";

/// Environment variable naming an optional TOML config file
pub const CONFIG_ENV: &str = "CHAT_SERVER_CONFIG";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "127.0.0.1:12345")
    pub bind_addr: String,
    /// Channel buffer size for server commands
    pub command_buffer: usize,
    /// Per-connection outbound queue size
    pub client_buffer: usize,
    /// Longest accepted inbound line, in bytes
    pub max_line_length: usize,
    /// Seconds a new connection has to send its nickname
    pub handshake_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            command_buffer: 256,
            client_buffer: 64,
            max_line_length: 1024,
            handshake_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    ///
    /// Channel capacities and the line limit must be non-zero.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.command_buffer == 0 {
            return Err(AppError::ConfigValue("command_buffer"));
        }
        if self.client_buffer == 0 {
            return Err(AppError::ConfigValue("client_buffer"));
        }
        if self.max_line_length == 0 {
            return Err(AppError::ConfigValue("max_line_length"));
        }
        Ok(())
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Defaults, overlaid by the file named in `CHAT_SERVER_CONFIG` if set
    pub fn from_env() -> Result<Self, AppError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Override the bind address
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}
