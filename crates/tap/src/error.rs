//! Error types for the tap crate

use std::io;
use thiserror::Error;

/// Errors raised while subscribing to a trigger
#[derive(Error, Debug)]
pub enum TapError {
    /// Installing the signal listener failed
    #[error("failed to install {signal} listener: {source}")]
    SignalInstall {
        signal: &'static str,
        #[source]
        source: io::Error,
    },

    /// Signal triggers need a running tokio runtime
    #[error("no tokio runtime available to listen for {signal}")]
    NoRuntime { signal: &'static str },

    /// The platform has no such signal
    #[error("{signal} is not supported on this platform")]
    Unsupported { signal: &'static str },
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;
