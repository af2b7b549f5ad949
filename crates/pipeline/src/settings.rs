//! Pipeline settings
//!
//! Built by hand or from an [`AccessLogConfig`].

use std::time::Duration;

use accesslog_config::{AccessLogConfig, AccessLogTarget, validate_delivery};
use accesslog_sinks::SinkTarget;

use crate::error::Result;

/// Settings for one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Name used in log lines
    pub name: String,

    /// Format string or shorthand name
    pub pattern: String,

    pub separator: String,

    /// Subscribe to the rotation trigger
    pub rotate_on_signal: bool,

    pub event_kinds: Vec<String>,

    /// Source channel bound
    pub queue_size: usize,

    /// Bytes the sink queues before pushing them to the output
    pub buffer_size: usize,

    pub flush_interval: Duration,
}

impl PipelineSettings {
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    #[must_use]
    pub fn with_rotate_on_signal(mut self, enabled: bool) -> Self {
        self.rotate_on_signal = enabled;
        self
    }

    #[must_use]
    pub fn with_event_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Reject settings the pipeline cannot run with
    ///
    /// Applies the same rules as the `[access_log]` config section.
    pub fn validate(&self) -> Result<()> {
        validate_delivery(
            &self.event_kinds,
            self.queue_size,
            self.buffer_size,
            self.flush_interval,
        )?;
        Ok(())
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&AccessLogConfig::default())
    }
}

impl From<&AccessLogConfig> for PipelineSettings {
    fn from(config: &AccessLogConfig) -> Self {
        Self {
            name: "access_log".into(),
            pattern: config.pattern.clone(),
            separator: config.separator.clone(),
            rotate_on_signal: config.rotate_on_signal,
            event_kinds: config.event_kinds.clone(),
            queue_size: config.queue_size,
            buffer_size: config.buffer_size,
            flush_interval: config.flush_interval,
        }
    }
}

/// Sink target for a configured access log target
pub fn sink_target(target: &AccessLogTarget) -> SinkTarget {
    match target {
        AccessLogTarget::Stdout => SinkTarget::stdout(),
        AccessLogTarget::Stderr => SinkTarget::stderr(),
        AccessLogTarget::File(path) => SinkTarget::path(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use accesslog_config::ConfigError;

    #[test]
    fn test_defaults_match_config_defaults() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.pattern, "combined");
        assert_eq!(settings.separator, "\n");
        assert!(settings.rotate_on_signal);
        assert_eq!(settings.event_kinds, vec!["response"]);
        assert_eq!(settings.queue_size, 1024);
        assert_eq!(settings.buffer_size, 64 * 1024);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_config() {
        let mut config = AccessLogConfig::with_target("stdout");
        config.pattern = "%h".into();
        config.rotate_on_signal = false;

        let settings = PipelineSettings::from(&config);
        assert_eq!(settings.pattern, "%h");
        assert!(!settings.rotate_on_signal);
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        for settings in [
            PipelineSettings::default().with_event_kinds(Vec::<String>::new()),
            PipelineSettings::default().with_event_kinds(["response", " "]),
            PipelineSettings::default().with_queue_size(0),
            PipelineSettings::default().with_flush_interval(Duration::ZERO),
        ] {
            assert!(matches!(
                settings.validate(),
                Err(PipelineError::Config(ConfigError::InvalidValue { .. }))
            ));
        }
    }

    #[test]
    fn test_sink_targets() {
        assert!(!sink_target(&AccessLogTarget::Stdout).is_rotatable());
        assert!(!sink_target(&AccessLogTarget::Stderr).is_rotatable());
        assert!(sink_target(&AccessLogTarget::File("a.log".into())).is_rotatable());
    }
}
