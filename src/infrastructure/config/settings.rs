//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. Every
//! section is optional in the TOML file. Secrets never come from the file:
//! `ENCRYPTION_KEY` is read by the cipher, and `AUGUR_DATABASE_URL` overrides
//! the database path.
//!
//! # Example
//!
//! ```no_run
//! use augur::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use super::chat::ChatConfig;
use super::database::{DatabaseConfig, DATABASE_URL_ENV};
use super::llm::LlmConfig;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP listener and request limits.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite file and pool settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Model provider settings shared by every organization.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chat turn limits.
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Applies the `AUGUR_DATABASE_URL` override before validating.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.database.url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed or
    /// validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `path` when it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] for an existing file.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::parse_toml("")
        }
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "server.bind",
                reason: format!("'{}' is not a socket address", self.server.bind),
            }
            .into());
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.request_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.body_limit_bytes",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.url",
            }
            .into());
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "llm.model" }.into());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature",
                reason: "must be between 0 and 2".to_string(),
            }
            .into());
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.chat.max_tool_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chat.max_tool_rounds",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.chat.turn_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chat.turn_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.chat.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chat.channel_capacity",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
