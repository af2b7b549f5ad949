//! Configuration validation
//!
//! Checks that the access log section is usable:
//! - A non-empty target is present
//! - At least one event kind, none of them empty
//! - Queue size, buffer size and flush interval are non-zero
//! - Diagnostics and access log do not share stdout or a file

use std::time::Duration;

use crate::Config;
use crate::access_log::{AccessLogConfig, AccessLogTarget};
use crate::error::{ConfigError, Result};
use crate::logging::LogOutput;

const SECTION: &str = "access_log";

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_access_log(&config.access_log)?;
    validate_outputs(config)?;
    Ok(())
}

/// Validate the access log section on its own
pub fn validate_access_log(access_log: &AccessLogConfig) -> Result<()> {
    match &access_log.target {
        None => return Err(ConfigError::missing_field(SECTION, "target")),
        Some(AccessLogTarget::File(path)) if path.trim().is_empty() => {
            return Err(ConfigError::invalid_value(
                SECTION,
                "target",
                "path must not be empty",
            ));
        }
        Some(_) => {}
    }

    validate_delivery(
        &access_log.event_kinds,
        access_log.queue_size,
        access_log.buffer_size,
        access_log.flush_interval,
    )
}

/// Validate the settings that shape delivery, whatever the target
///
/// Shared by the config section and pipelines built by hand.
pub fn validate_delivery(
    event_kinds: &[String],
    queue_size: usize,
    buffer_size: usize,
    flush_interval: Duration,
) -> Result<()> {
    if event_kinds.is_empty() {
        return Err(ConfigError::invalid_value(
            SECTION,
            "event_kinds",
            "at least one event kind is required",
        ));
    }

    if event_kinds.iter().any(|kind| kind.trim().is_empty()) {
        return Err(ConfigError::invalid_value(
            SECTION,
            "event_kinds",
            "event kinds must not be empty",
        ));
    }

    if queue_size == 0 {
        return Err(ConfigError::invalid_value(
            SECTION,
            "queue_size",
            "must be at least 1",
        ));
    }

    if buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            SECTION,
            "buffer_size",
            "must be at least 1",
        ));
    }

    if flush_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            SECTION,
            "flush_interval",
            "must be greater than zero",
        ));
    }

    Ok(())
}

/// Diagnostics interleaved with access log lines would corrupt the log
fn validate_outputs(config: &Config) -> Result<()> {
    let clash = match (&config.log.output, &config.access_log.target) {
        (LogOutput::Stdout, Some(AccessLogTarget::Stdout)) => true,
        (LogOutput::File(log), Some(AccessLogTarget::File(access))) => log == access,
        _ => false,
    };

    if clash {
        return Err(ConfigError::invalid_value(
            "log",
            "output",
            "must differ from the access log target",
        ));
    }

    Ok(())
}
