//! Formatting stage
//!
//! Renders records into owned lines and reports directives that fell back to
//! `-`: unknown directives as rate-limited warnings, missing values at debug.

use bytes::Bytes;
use tracing::{debug, warn};

use accesslog_format::{EventRecord, Renderer, UnresolvedReason};
use accesslog_sinks::util::RateLimitedLogger;

/// One rendered line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLine {
    /// Line plus separator
    pub line: Bytes,

    /// Directives that rendered as `-`
    pub unresolved: usize,
}

/// Renders records one at a time, reusing its buffer
pub struct FormattingStage {
    renderer: Renderer,
    buffer: String,
    unknown_logger: RateLimitedLogger,
}

impl FormattingStage {
    pub fn new(renderer: Renderer) -> Self {
        for code in renderer.pattern().unknown_codes() {
            warn!(code, "access log pattern contains an unknown directive, it will render as '-'");
        }

        Self {
            renderer,
            buffer: String::with_capacity(256),
            unknown_logger: RateLimitedLogger::default(),
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Render one record
    pub fn format(&mut self, record: &EventRecord) -> FormattedLine {
        let mut unresolved = Vec::new();
        self.renderer
            .render_into(record, &mut self.buffer, &mut unresolved);

        for entry in &unresolved {
            match entry.reason {
                UnresolvedReason::UnknownDirective => {
                    self.unknown_logger
                        .warn("unknown access log directive rendered as '-'", &entry.code);
                }
                UnresolvedReason::MissingValue => {
                    debug!(code = entry.code, kind = %record.kind, "directive has no value");
                }
            }
        }

        FormattedLine {
            line: Bytes::copy_from_slice(self.buffer.as_bytes()),
            unresolved: unresolved.len(),
        }
    }
}

#[cfg(test)]
#[path = "stage_test.rs"]
mod stage_test;
