//! Access log configuration
//!
//! # Example
//!
//! ```toml
//! [access_log]
//! target = "/var/log/app/access.log"   # or "stdout" / "stderr"
//! pattern = "combined"
//! separator = "\n"
//! rotate_on_signal = true
//! event_kinds = ["response"]
//! queue_size = 1024
//! buffer_size = 65536
//! flush_interval = "100ms"
//! ```
//!
//! The section may also be a bare string naming the target:
//!
//! ```toml
//! access_log = "/var/log/app/access.log"
//! ```

use std::fmt;
use std::time::Duration;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Where access log lines go
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccessLogTarget {
    Stdout,
    Stderr,
    /// File path, reopened on rotation
    #[serde(untagged)]
    File(String),
}

impl AccessLogTarget {
    /// Whether rotation reopens anything for this target
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl From<&str> for AccessLogTarget {
    fn from(value: &str) -> Self {
        match value {
            "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            path => Self::File(path.to_string()),
        }
    }
}

impl fmt::Display for AccessLogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
            Self::File(path) => f.write_str(path),
        }
    }
}

/// Access log settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AccessLogConfig {
    /// Required; validation rejects a config without one
    pub target: Option<AccessLogTarget>,

    /// Format string or shorthand name
    /// Default: "combined"
    pub pattern: String,

    /// Appended after every line
    /// Default: "\n"
    pub separator: String,

    /// Reopen the target file on SIGHUP
    /// Default: true
    pub rotate_on_signal: bool,

    /// Event kinds that produce a line
    /// Default: ["response"]
    pub event_kinds: Vec<String>,

    /// Records buffered between the source and the writer
    /// Default: 1024
    pub queue_size: usize,

    /// Write buffer per open file
    /// Default: 64KB
    pub buffer_size: usize,

    /// How often buffered lines are pushed to the target
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
}

impl AccessLogConfig {
    /// Defaults with the given target
    pub fn with_target(target: impl Into<AccessLogTarget>) -> Self {
        Self {
            target: Some(target.into()),
            ..Default::default()
        }
    }
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            target: None,
            pattern: "combined".into(),
            separator: "\n".into(),
            rotate_on_signal: true,
            event_kinds: vec!["response".into()],
            queue_size: 1024,
            buffer_size: 64 * 1024,
            flush_interval: Duration::from_millis(100),
        }
    }
}

/// Deserialize `access_log` from either a target string or a table
pub(crate) fn string_or_table<'de, D>(deserializer: D) -> Result<AccessLogConfig, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrTable;

    impl<'de> Visitor<'de> for StringOrTable {
        type Value = AccessLogConfig;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a target string or an access_log table")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(AccessLogConfig::with_target(value))
        }

        fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
            AccessLogConfig::deserialize(de::value::MapAccessDeserializer::new(map))
        }
    }

    deserializer.deserialize_any(StringOrTable)
}
