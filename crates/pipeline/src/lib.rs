//! Access log - Pipeline
//!
//! Connects a record source to a rotating sink.
//!
//! # Architecture
//!
//! ```text
//! [JsonLinesSource] ──→ mpsc::Receiver<EventRecord> ──→ [KindFilter] ──→ [FormattingStage]
//!                                                                               │ Bytes
//!                        [RotationTrigger] ──→ rotate() ──→ [RotatingSink] ←────┘
//! ```
//!
//! # Key Design
//!
//! - **Single run loop**: records are rendered and written strictly in arrival order
//! - **Backpressure**: a detached sink holds one line and stops pulling records
//! - **Drop-guarded subscription**: stopping releases the trigger deterministically
//! - **Drain on stop**: queued records are written before the output closes
//!
//! # Example
//!
//! ```ignore
//! use accesslog_pipeline::{Pipeline, PipelineSettings};
//! use accesslog_sinks::SinkTarget;
//! use accesslog_tap::HangupSignal;
//!
//! let pipeline = Pipeline::new(PipelineSettings::default(), SinkTarget::path("access.log"))?
//!     .with_trigger(HangupSignal::global());
//! let (tx, rx) = pipeline.channel();
//! let handle = pipeline.start(rx)?;
//!
//! tx.send(record).await?;
//! let report = handle.stop().await?;
//! ```

mod coordinator;
mod error;
mod filter;
mod metrics;
mod settings;
mod source;
mod stage;

pub use coordinator::{Pipeline, PipelineHandle, StopReport};
pub use error::{PipelineError, Result};
pub use filter::KindFilter;
pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot};
pub use settings::{PipelineSettings, sink_target};
pub use source::{JsonLinesSource, SourceStats};
pub use stage::{FormattedLine, FormattingStage};
