//! Pipeline error types

use thiserror::Error;

use accesslog_config::ConfigError;
use accesslog_sinks::SinkError;
use accesslog_tap::TapError;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Settings rejected before anything was opened
    #[error("invalid access log settings: {0}")]
    Config(#[from] ConfigError),

    /// Opening or rotating the output failed
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Subscribing to the rotation trigger failed
    #[error("rotation trigger unavailable: {0}")]
    Trigger(#[from] TapError),

    /// The run loop panicked or was aborted
    #[error("pipeline task failed: {0}")]
    TaskFailed(String),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
