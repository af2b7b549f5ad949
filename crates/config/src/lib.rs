//! Access log configuration
//!
//! TOML-based configuration loading with sensible defaults. Only the access
//! log target is required.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use accesslog_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("access_log = \"stdout\"").unwrap();
//! assert_eq!(config.access_log.pattern, "combined");
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "console"
//!
//! [access_log]
//! target = "/var/log/app/access.log"
//! pattern = "combined"
//! rotate_on_signal = true
//! ```

mod access_log;
mod error;
mod logging;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use access_log::{AccessLogConfig, AccessLogTarget};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use validation::{validate_access_log, validate_delivery};

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Diagnostic logging of the writer itself
    pub log: LogConfig,

    /// The access log being written
    #[serde(deserialize_with = "access_log::string_or_table")]
    pub access_log: AccessLogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration after fields were set programmatically
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
