//! JSON-lines record source
//!
//! Reads one JSON event record per line from any async reader and forwards
//! it to the pipeline's record channel. Blank lines are skipped. Lines that
//! are not a JSON object are malformed: they are reported through a
//! rate-limited warning and skipped. A mistyped field inside an object only
//! reads as absent.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use accesslog_format::EventRecord;
use accesslog_sinks::util::RateLimitedLogger;

/// Counters for one source run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub lines_read: u64,
    pub records_sent: u64,
    pub blank_lines: u64,
    pub malformed_lines: u64,
}

/// Reads newline-delimited JSON records
pub struct JsonLinesSource<R> {
    reader: BufReader<R>,
    malformed_logger: RateLimitedLogger,
}

impl<R: AsyncRead + Unpin> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            malformed_logger: RateLimitedLogger::default(),
        }
    }

    /// Forward records until EOF, cancellation, or the pipeline closing
    ///
    /// Only read errors are returned; malformed input never ends the run.
    pub async fn run(
        mut self,
        records: mpsc::Sender<EventRecord>,
        cancel: CancellationToken,
    ) -> io::Result<SourceStats> {
        let mut stats = SourceStats::default();
        let mut line = Vec::with_capacity(1024);

        loop {
            line.clear();
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("json source cancelled");
                    break;
                }
                read = self.reader.read_until(b'\n', &mut line) => read?,
            };
            if read == 0 {
                debug!("json source reached end of input");
                break;
            }
            stats.lines_read += 1;

            let Some(record) = self.parse(&line, &mut stats) else {
                continue;
            };

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = records.send(record) => sent,
            };
            if sent.is_err() {
                debug!("pipeline closed, json source stopping");
                break;
            }
            stats.records_sent += 1;
        }

        info!(
            lines_read = stats.lines_read,
            records_sent = stats.records_sent,
            malformed_lines = stats.malformed_lines,
            "json source finished"
        );
        Ok(stats)
    }

    fn parse(&self, line: &[u8], stats: &mut SourceStats) -> Option<EventRecord> {
        if line.iter().all(u8::is_ascii_whitespace) {
            stats.blank_lines += 1;
            return None;
        }

        match EventRecord::from_json(line) {
            Ok(record) => Some(record),
            Err(e) => {
                stats.malformed_lines += 1;
                self.malformed_logger
                    .warn("skipping malformed event record", &e);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod source_test;
