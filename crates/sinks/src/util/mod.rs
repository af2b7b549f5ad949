//! Sink utilities
//!
//! - **chain_writer**: writer chains over files and streams
//! - **rate_limited_logger**: keeps repeated failures from flooding the log

pub mod chain_writer;
pub mod rate_limited_logger;

pub use chain_writer::{ChainWrite, ChainWriter, PlainTextWriter};
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
