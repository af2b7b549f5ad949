//! Rotating file sink
//!
//! Appends rendered lines to one output. On request, a rotation swaps the
//! open handle for a fresh handle to the same path. Log rotation tools rename
//! the file away and then ask for a reopen: after rotation new lines land in
//! a new file at the configured path while the previous handle is synced and
//! closed in the background.
//!
//! # Architecture
//!
//! ```text
//!                  ┌────────────────── Mutex<Output> ───────────────────┐
//! write(line) ───→ │ Pending queue ──drain──→ Attached(handle) ──→ path │
//!                  └────────────────────────────────────────────────────┘
//! rotate(): drain into old ──→ Unattached ──→ open(path) ──→ Attached(new)
//!                │
//!                └──→ spawn_blocking(old.finish())
//! ```
//!
//! Accepted lines stay in the pending queue until a handle has taken every
//! byte of them. A handle that fails mid-drain leaves the rest queued, and
//! the next attached handle receives them ahead of any later line.
//!
//! # States
//!
//! | State | Writes | Left by |
//! |-------|--------|---------|
//! | `Unattached` | rejected | an open (only seen inside a rotation) |
//! | `Attached` | queued | a rotation, a drain failure, close |
//! | `Detached` | rejected, line handed back | a rotation |
//! | `Closed` | rejected | never |
//!
//! A failed drain never reopens on its own. The caller keeps the rejected
//! line and retries after the next rotation re-attaches the sink. Lines still
//! queued when the sink closes are counted in `lines_dropped`.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, IoSlice, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{Buf, Bytes};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::common::{SinkError, SinkMetrics, SinkMetricsSnapshot};
use crate::util::{ChainWrite, ChainWriter, PlainTextWriter, RateLimitedLogger};

/// Default pending queue size before lines are pushed to the output (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Lines handed to one vectored write
const WRITE_BATCH: usize = 64;

/// Configuration for a rotating sink
#[derive(Debug, Clone)]
pub struct RotatingSinkConfig {
    /// Name used in log lines
    pub name: String,

    /// Queued bytes that make the next write drain to the output first
    pub buffer_size: usize,
}

impl RotatingSinkConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

impl Default for RotatingSinkConfig {
    fn default() -> Self {
        Self {
            name: "access_log".into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Where a sink writes
pub enum SinkTarget {
    /// A file path, opened in append mode and reopened on rotation
    Path(PathBuf),

    /// A caller-supplied stream; rotation is a no-op
    Stream(Box<dyn Write + Send>),
}

impl SinkTarget {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn stream(stream: impl Write + Send + 'static) -> Self {
        Self::Stream(Box::new(stream))
    }

    pub fn stdout() -> Self {
        Self::stream(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::stream(io::stderr())
    }

    pub fn is_rotatable(&self) -> bool {
        matches!(self, Self::Path(_))
    }
}

impl fmt::Debug for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Observable sink state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Unattached,
    Attached,
    Detached,
    Closed,
}

impl SinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unattached => "unattached",
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a rotation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    /// A new handle is attached
    Rotated { generation: u64 },

    /// The sink writes to a stream, nothing was reopened
    NotRotatable,
}

/// A write the sink did not accept
///
/// Carries the line back so the caller can retry it after a rotation.
#[derive(Debug)]
pub struct Rejected {
    pub line: Bytes,
    pub error: SinkError,
}

enum Slot {
    Unattached,
    Attached(Box<dyn ChainWrite>),
    Detached,
    Closed,
}

impl Slot {
    fn unavailable(&self) -> SinkError {
        match self {
            Self::Closed => SinkError::Closed,
            Self::Detached => SinkError::Detached,
            Self::Unattached | Self::Attached(_) => SinkError::Unattached,
        }
    }
}

/// Accepted lines not yet taken in full by a handle
#[derive(Default)]
struct Pending {
    lines: VecDeque<Bytes>,
    bytes: usize,
}

impl Pending {
    fn push(&mut self, line: Bytes) {
        self.bytes += line.len();
        self.lines.push_back(line);
    }

    fn len(&self) -> usize {
        self.lines.len()
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Write queued lines to `out` in order
    ///
    /// A line leaves the queue only once every byte of it was written. On
    /// error the unwritten remainder stays queued, starting mid-line if the
    /// output took part of one.
    fn drain_into<W>(&mut self, out: &mut W, metrics: &SinkMetrics) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        while !self.lines.is_empty() {
            let written = {
                let slices: Vec<IoSlice<'_>> = self
                    .lines
                    .iter()
                    .take(WRITE_BATCH)
                    .map(|line| IoSlice::new(line))
                    .collect();
                match out.write_vectored(&slices) {
                    Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            };
            metrics.wrote_bytes(written);
            self.consume(written, metrics);
        }
        Ok(())
    }

    fn consume(&mut self, mut written: usize, metrics: &SinkMetrics) {
        self.bytes -= written;
        while written > 0 {
            let Some(front) = self.lines.front_mut() else {
                break;
            };
            if written >= front.len() {
                written -= front.len();
                self.lines.pop_front();
                metrics.line_written();
            } else {
                front.advance(written);
                written = 0;
            }
        }
    }
}

/// Everything guarded by the sink mutex
struct Output {
    slot: Slot,
    pending: Pending,
}

struct Inner {
    config: RotatingSinkConfig,

    /// `None` for stream targets
    path: Option<PathBuf>,

    writer: Arc<dyn ChainWriter>,

    /// Writes, flushes, rotations and close serialize here
    output: Mutex<Output>,

    state: watch::Sender<SinkState>,

    /// Incremented on every attach, starting at 1 for the initial open
    generation: AtomicU64,

    metrics: SinkMetrics,

    error_logger: RateLimitedLogger,

    /// Previous handles still syncing and closing
    drains: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

/// Line sink that can reopen its file on demand
///
/// Cheap to clone; clones share the same handle.
#[derive(Clone)]
pub struct RotatingSink {
    inner: Arc<Inner>,
}

impl RotatingSink {
    /// Open a sink with the plain text writer
    ///
    /// Fails if a path target cannot be opened.
    pub fn open(target: SinkTarget, config: RotatingSinkConfig) -> Result<Self, SinkError> {
        Self::open_with_writer(target, config, PlainTextWriter)
    }

    /// Open a sink with a custom chain writer
    pub fn open_with_writer<W>(
        target: SinkTarget,
        config: RotatingSinkConfig,
        writer: W,
    ) -> Result<Self, SinkError>
    where
        W: ChainWriter + 'static,
    {
        let writer: Arc<dyn ChainWriter> = Arc::new(writer);

        let (path, handle) = match target {
            SinkTarget::Path(path) => {
                let handle = writer
                    .open(&path)
                    .map_err(|e| SinkError::open(&path, e))?;
                (Some(path), handle)
            }
            SinkTarget::Stream(stream) => (None, writer.adopt(stream)),
        };

        let metrics = SinkMetrics::new();
        metrics.opened();

        tracing::info!(
            sink = %config.name,
            path = ?path,
            "access log opened"
        );

        let (state, _) = watch::channel(SinkState::Attached);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                path,
                writer,
                output: Mutex::new(Output {
                    slot: Slot::Attached(handle),
                    pending: Pending::default(),
                }),
                state,
                generation: AtomicU64::new(1),
                metrics,
                error_logger: RateLimitedLogger::default(),
                drains: parking_lot::Mutex::new(Vec::new()),
            }),
        })
    }

    /// Queue one line for the current handle
    ///
    /// Once the queue holds `buffer_size` bytes it is drained to the handle
    /// before the new line joins it. If that drain fails the handle is
    /// detached, the line is handed back untouched and every later write is
    /// rejected until a rotation re-attaches the sink. Queued lines are kept
    /// for the next handle.
    pub async fn write(&self, line: Bytes) -> Result<(), Rejected> {
        let mut guard = self.inner.output.lock().await;
        let output = &mut *guard;

        let handle = match &mut output.slot {
            Slot::Attached(handle) => handle,
            other => {
                return Err(Rejected {
                    error: other.unavailable(),
                    line,
                });
            }
        };

        if line.is_empty() {
            return Ok(());
        }

        let full = output.pending.bytes + line.len() > self.inner.config.buffer_size;
        if full
            && !output.pending.is_empty()
            && let Err(e) = output.pending.drain_into(&mut **handle, &self.inner.metrics)
        {
            self.fail(&mut output.slot, "access log write failed, detaching output", &e);
            return Err(Rejected {
                line,
                error: SinkError::Write(e),
            });
        }

        output.pending.push(line);
        Ok(())
    }

    /// Push queued lines to the operating system
    ///
    /// A no-op unless attached. A failure detaches the handle like a failed
    /// write, keeping whatever was not written queued.
    pub async fn flush(&self) -> Result<(), SinkError> {
        let mut guard = self.inner.output.lock().await;
        let output = &mut *guard;

        let Slot::Attached(handle) = &mut output.slot else {
            return Ok(());
        };

        let result = output
            .pending
            .drain_into(&mut **handle, &self.inner.metrics)
            .and_then(|()| handle.flush_all());

        if let Err(e) = result {
            self.fail(&mut output.slot, "access log flush failed, detaching output", &e);
            return Err(SinkError::Write(e));
        }

        self.inner.metrics.flush();
        Ok(())
    }

    /// Swap the current handle for a fresh one at the same path
    ///
    /// Lines accepted before the rotation are drained to the old handle
    /// first, so they precede every later line. Lines the old handle cannot
    /// take stay queued for the new one. The old handle is then synced and
    /// closed in the background. Concurrent rotations serialize.
    ///
    /// A stream target returns [`RotateOutcome::NotRotatable`]. If the reopen
    /// fails the sink is left detached and a later rotation may recover it.
    pub async fn rotate(&self) -> Result<RotateOutcome, SinkError> {
        let mut guard = self.inner.output.lock().await;
        let output = &mut *guard;

        if matches!(output.slot, Slot::Closed) {
            return Err(SinkError::Closed);
        }

        let Some(path) = self.inner.path.as_deref() else {
            tracing::debug!(sink = %self.inner.config.name, "stream output is not rotatable");
            return Ok(RotateOutcome::NotRotatable);
        };

        if let Slot::Attached(mut handle) = mem::replace(&mut output.slot, Slot::Unattached) {
            if let Err(e) = output.pending.drain_into(&mut *handle, &self.inner.metrics) {
                self.inner.metrics.write_error();
                tracing::warn!(
                    sink = %self.inner.config.name,
                    error = %e,
                    queued = output.pending.len(),
                    "previous access log handle failed, moving queued lines to the new handle"
                );
            }
            self.retire(handle);
        }
        self.inner.state.send_replace(SinkState::Unattached);

        match self.inner.writer.open(path) {
            Ok(handle) => {
                output.slot = Slot::Attached(handle);
                let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
                self.inner.metrics.rotated();
                self.inner.state.send_replace(SinkState::Attached);

                tracing::info!(
                    sink = %self.inner.config.name,
                    path = %path.display(),
                    generation,
                    queued = output.pending.len(),
                    "access log reopened"
                );
                Ok(RotateOutcome::Rotated { generation })
            }
            Err(e) => {
                output.slot = Slot::Detached;
                self.inner.state.send_replace(SinkState::Detached);
                self.inner.metrics.rotation_failed();

                tracing::error!(
                    sink = %self.inner.config.name,
                    path = %path.display(),
                    error = %e,
                    queued = output.pending.len(),
                    "failed to reopen access log, output detached"
                );
                Err(SinkError::open(path, e))
            }
        }
    }

    /// Drain queued lines, then sync and close the current handle
    ///
    /// Also waits for previous handles still closing in the background.
    /// Lines that never reached an output are counted in `lines_dropped`.
    /// Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), SinkError> {
        let (previous, pending) = {
            let mut output = self.inner.output.lock().await;
            let previous = mem::replace(&mut output.slot, Slot::Closed);
            self.inner.state.send_replace(SinkState::Closed);
            (previous, mem::take(&mut output.pending))
        };

        let (left, result) = match previous {
            Slot::Attached(handle) => self.finish(handle, pending).await,
            Slot::Closed => return Ok(()),
            Slot::Unattached | Slot::Detached => (pending, Ok(())),
        };

        let drains = mem::take(&mut *self.inner.drains.lock());
        for task in drains {
            if let Err(e) = task.await {
                tracing::warn!(sink = %self.inner.config.name, error = %e, "drain task failed");
            }
        }

        if !left.is_empty() {
            self.inner.metrics.dropped(left.len());
            tracing::error!(
                sink = %self.inner.config.name,
                lines = left.len(),
                bytes = left.bytes,
                "access log closed with lines that never reached the output"
            );
        }

        match &result {
            Ok(()) => tracing::info!(sink = %self.inner.config.name, "access log closed"),
            Err(e) => tracing::error!(
                sink = %self.inner.config.name,
                error = %e,
                "failed to close access log"
            ),
        }
        result
    }

    /// Wait until the sink is attached or closed
    pub async fn wait_attached(&self) -> SinkState {
        let mut rx = self.inner.state.subscribe();
        match rx
            .wait_for(|state| matches!(state, SinkState::Attached | SinkState::Closed))
            .await
        {
            Ok(state) => *state,
            Err(_) => SinkState::Closed,
        }
    }

    pub fn state(&self) -> SinkState {
        *self.inner.state.borrow()
    }

    /// Number of handles attached so far; the initial open is generation 1
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Configured path, `None` for stream targets
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn is_rotatable(&self) -> bool {
        self.inner.path.is_some()
    }

    pub fn metrics(&self) -> SinkMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Count and log a failed drain, then detach the handle
    fn fail(&self, slot: &mut Slot, message: &str, error: &io::Error) {
        self.inner.metrics.write_error();
        self.inner.error_logger.error(message, error);
        if let Slot::Attached(handle) = mem::replace(slot, Slot::Detached) {
            self.retire(handle);
        }
        self.inner.state.send_replace(SinkState::Detached);
    }

    /// Sync and close a previous handle off the runtime
    fn retire(&self, handle: Box<dyn ChainWrite>) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || {
            if let Err(e) = handle.finish() {
                inner.metrics.drain_error();
                tracing::warn!(
                    sink = %inner.config.name,
                    error = %e,
                    "failed to close previous access log handle"
                );
            }
        });

        let mut drains = self.inner.drains.lock();
        drains.retain(|task| !task.is_finished());
        drains.push(task);
    }

    /// Drain the final queue and close the last handle off the runtime
    ///
    /// Returns whatever stayed queued.
    async fn finish(
        &self,
        mut handle: Box<dyn ChainWrite>,
        mut pending: Pending,
    ) -> (Pending, Result<(), SinkError>) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || {
            let result = match pending.drain_into(&mut *handle, &inner.metrics) {
                Ok(()) => handle.finish(),
                Err(e) => {
                    inner.metrics.write_error();
                    Err(e)
                }
            };
            (pending, result)
        });

        match task.await {
            Ok((left, result)) => (left, result.map_err(SinkError::Close)),
            Err(e) => (Pending::default(), Err(SinkError::Close(io::Error::other(e)))),
        }
    }
}

impl fmt::Debug for RotatingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingSink")
            .field("name", &self.inner.config.name)
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}
