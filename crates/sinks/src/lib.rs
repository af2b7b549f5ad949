//! Access log - Sinks
//!
//! Line sinks for rendered access log entries.
//!
//! # Architecture
//!
//! The pipeline hands each rendered line to a [`RotatingSink`], which appends
//! it to a file (or a stream such as stdout). Lines wait in the sink's queue
//! until a writer chain has taken them in full. A rotation swaps the file
//! handle for a fresh one at the same path without losing or reordering
//! lines.
//!
//! ```text
//! [Pipeline] --Bytes--> [RotatingSink] --> [ChainWrite] --> [File at path]
//!                            ↑ rotate()
//!                     [Rotation trigger]
//! ```
//!
//! # Example
//!
//! ```ignore
//! use accesslog_sinks::{RotatingSink, RotatingSinkConfig, SinkTarget};
//!
//! let sink = RotatingSink::open(SinkTarget::path("/var/log/access.log"), RotatingSinkConfig::default())?;
//! sink.write(bytes::Bytes::from_static(b"line\n")).await?;
//! sink.rotate().await?;
//! sink.close().await?;
//! ```

mod common;

/// Rotating file sink
pub mod rotating;

/// Writer chains and logging helpers shared by sinks
pub mod util;

pub use common::{SinkError, SinkMetrics, SinkMetricsSnapshot};
pub use rotating::{
    DEFAULT_BUFFER_SIZE, Rejected, RotateOutcome, RotatingSink, RotatingSinkConfig, SinkState,
    SinkTarget,
};
