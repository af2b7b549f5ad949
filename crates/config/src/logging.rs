//! Diagnostic logging configuration
//!
//! Covers the writer's own `tracing` output, never the access log lines.
//! Diagnostics go to stderr unless configured otherwise, so an access log
//! written to stdout stays clean.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Minimum level of diagnostic events
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic line format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

/// Diagnostic destination
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    /// Appended to, never rotated
    #[serde(untagged)]
    File(String),
}

impl LogOutput {
    /// File path, if diagnostics go to a file
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(Path::new(path)),
            Self::Stdout | Self::Stderr => None,
        }
    }

    /// Whether output goes to a standard stream, where colors make sense
    pub fn is_stream(&self) -> bool {
        self.path().is_none()
    }
}

/// `[log]` section
///
/// ```toml
/// [log]
/// level = "warn"
/// format = "json"
/// output = "/var/log/accesslog/diagnostics.log"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> LogConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_defaults_keep_stdout_free() {
        let config = parse("");
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Console);
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.output.is_stream());
    }

    #[test]
    fn test_file_output() {
        let config = parse(
            r#"
format = "json"
output = "/var/log/accesslog/diagnostics.log"
"#,
        );
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(
            config.output.path(),
            Some(Path::new("/var/log/accesslog/diagnostics.log"))
        );
        assert!(!config.output.is_stream());
    }

    #[test]
    fn test_stream_outputs_are_keywords() {
        assert_eq!(parse(r#"output = "stdout""#).output, LogOutput::Stdout);
        assert_eq!(parse(r#"output = "stderr""#).output, LogOutput::Stderr);
    }

    #[test]
    fn test_level_names_round_trip_to_filter_directives() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            let config = parse(&format!("level = \"{level}\""));
            assert_eq!(config.level, level);
        }
        assert!(LogLevel::Trace < LogLevel::Error);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<LogConfig>("colour = true").is_err());
    }
}
