//! Pipeline coordinator
//!
//! Owns the run loop that moves records from the source channel through the
//! kind filter and formatting stage into the rotating sink, and reacts to the
//! rotation trigger.
//!
//! # Run loop
//!
//! ```text
//!            ┌── cancel ──────────────→ shutdown
//!  select! ──┼── trigger ─────────────→ sink.rotate()
//!  (biased)  ├── flush tick ──────────→ sink.flush()
//!            └── records.recv() ──→ filter ──→ stage ──→ pending line
//!
//!  pending line ──→ sink.write() ──ok──→ next record
//!                        │
//!                        └─rejected─→ hold line, stop pulling records,
//!                                     wait for re-attach / trigger / cancel
//! ```
//!
//! At most one rendered line is held at a time, so a detached sink
//! back-pressures the bounded source channel instead of buffering without
//! limit or dropping.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use accesslog_config::{AccessLogConfig, ConfigError, validate_access_log};
use accesslog_format::{CompiledPattern, EventRecord, Renderer};
use accesslog_sinks::{
    RotateOutcome, RotatingSink, RotatingSinkConfig, SinkError, SinkMetricsSnapshot, SinkTarget,
};
use accesslog_tap::{RotationTrigger, TriggerSubscription};

use crate::error::{PipelineError, Result};
use crate::filter::KindFilter;
use crate::metrics::{PipelineMetrics, PipelineMetricsSnapshot};
use crate::settings::{PipelineSettings, sink_target};
use crate::stage::FormattingStage;

/// A configured pipeline with its output already open
pub struct Pipeline {
    settings: PipelineSettings,
    renderer: Renderer,
    sink: RotatingSink,
    trigger: Option<Arc<dyn RotationTrigger>>,
}

impl Pipeline {
    /// Compile the pattern and open the output
    ///
    /// Fails with [`PipelineError::Config`] if the settings are unusable or a
    /// file target cannot be opened.
    pub fn new(settings: PipelineSettings, target: SinkTarget) -> Result<Self> {
        settings.validate()?;

        let renderer = Renderer::new(CompiledPattern::compile(&settings.pattern))
            .with_separator(settings.separator.as_str());

        let sink_config =
            RotatingSinkConfig::new(settings.name.as_str()).with_buffer_size(settings.buffer_size);
        let sink = RotatingSink::open(target, sink_config).map_err(|e| match e {
            SinkError::Open { path, source } => ConfigError::Target { path, source }.into(),
            other => PipelineError::from(other),
        })?;

        Ok(Self {
            settings,
            renderer,
            sink,
            trigger: None,
        })
    }

    /// Build a pipeline from a validated config section
    pub fn from_config(config: &AccessLogConfig) -> Result<Self> {
        validate_access_log(config)?;
        let target = config
            .target
            .as_ref()
            .ok_or_else(|| ConfigError::missing_field("access_log", "target"))?;

        Self::new(PipelineSettings::from(config), sink_target(target))
    }

    /// Rotate when `trigger` fires, if rotation is enabled
    #[must_use]
    pub fn with_trigger(mut self, trigger: Arc<dyn RotationTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn sink(&self) -> &RotatingSink {
        &self.sink
    }

    /// A bounded record channel sized by `queue_size`
    pub fn channel(&self) -> (mpsc::Sender<EventRecord>, mpsc::Receiver<EventRecord>) {
        mpsc::channel(self.settings.queue_size)
    }

    /// Spawn the run loop reading from `records`
    ///
    /// Subscribes to the trigger only when rotation is enabled.
    pub fn start(self, records: mpsc::Receiver<EventRecord>) -> Result<PipelineHandle> {
        let subscription = match &self.trigger {
            Some(trigger) if self.settings.rotate_on_signal => {
                let subscription = trigger.subscribe()?;
                info!(
                    pipeline = %self.settings.name,
                    trigger = trigger.name(),
                    "rotation on trigger enabled"
                );
                Some(subscription)
            }
            Some(trigger) => {
                debug!(
                    pipeline = %self.settings.name,
                    trigger = trigger.name(),
                    "rotation disabled, not subscribing"
                );
                None
            }
            None => None,
        };

        let mut flush_ticker = tokio::time::interval(self.settings.flush_interval);
        flush_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let cancel = CancellationToken::new();
        let metrics = Arc::new(PipelineMetrics::new());

        let run_loop = RunLoop {
            name: self.settings.name.clone(),
            sink: self.sink.clone(),
            filter: KindFilter::new(self.settings.event_kinds.iter().cloned()),
            stage: FormattingStage::new(self.renderer),
            records,
            subscription,
            cancel: cancel.clone(),
            metrics: Arc::clone(&metrics),
            flush_ticker,
        };

        info!(
            pipeline = %self.settings.name,
            pattern = %run_loop.stage.renderer().pattern().source(),
            event_kinds = ?self.settings.event_kinds,
            rotatable = self.sink.is_rotatable(),
            "access log pipeline starting"
        );

        Ok(PipelineHandle {
            sink: self.sink,
            cancel,
            metrics,
            task: tokio::spawn(run_loop.run()),
        })
    }
}

/// Handle to a running pipeline
pub struct PipelineHandle {
    sink: RotatingSink,
    cancel: CancellationToken,
    metrics: Arc<PipelineMetrics>,
    task: JoinHandle<StopReport>,
}

impl PipelineHandle {
    /// Rotate the output now, serialized with trigger-driven rotations
    pub async fn rotate(&self) -> Result<RotateOutcome> {
        Ok(self.sink.rotate().await?)
    }

    pub fn sink(&self) -> &RotatingSink {
        &self.sink
    }

    pub fn metrics(&self) -> PipelineMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether the run loop has ended, by stop or source exhaustion
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the pipeline and wait for it to finish
    ///
    /// Records already queued are still written. The output is flushed and
    /// closed and the trigger subscription dropped before this returns.
    pub async fn stop(self) -> Result<StopReport> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the pipeline to end on its own when the source closes
    pub async fn wait(self) -> Result<StopReport> {
        self.task
            .await
            .map_err(|e| PipelineError::TaskFailed(e.to_string()))
    }
}

/// Final accounting of a stopped pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopReport {
    pub metrics: PipelineMetricsSnapshot,

    pub sink: SinkMetricsSnapshot,

    /// Rendered lines that never reached the output, whether the sink
    /// rejected them or still held them when it closed
    pub undelivered: u64,

    /// Whether the final flush and close succeeded
    pub closed_cleanly: bool,
}

struct RunLoop {
    name: String,
    sink: RotatingSink,
    filter: KindFilter,
    stage: FormattingStage,
    records: mpsc::Receiver<EventRecord>,
    subscription: Option<TriggerSubscription>,
    cancel: CancellationToken,
    metrics: Arc<PipelineMetrics>,
    flush_ticker: Interval,
}

impl RunLoop {
    async fn run(mut self) -> StopReport {
        let mut pending: Option<Bytes> = None;

        loop {
            if let Some(line) = pending.take() {
                match self.sink.write(line).await {
                    Ok(()) => {
                        self.metrics.record_written();
                        continue;
                    }
                    Err(rejected) => {
                        pending = Some(rejected.line);
                        if !rejected.error.is_recoverable() {
                            break;
                        }
                        self.metrics.record_held();

                        // Hold the line and stop pulling records until the sink can take it
                        tokio::select! {
                            biased;
                            _ = self.cancel.cancelled() => break,
                            fired = next_trigger(&mut self.subscription) => self.on_trigger(fired).await,
                            _ = self.sink.wait_attached() => {}
                        }
                        continue;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                fired = next_trigger(&mut self.subscription) => self.on_trigger(fired).await,
                _ = self.flush_ticker.tick() => {
                    // Failures detach the sink, which logs them
                    let _ = self.sink.flush().await;
                }
                record = self.records.recv() => match record {
                    Some(record) => pending = self.process(record),
                    None => {
                        debug!(pipeline = %self.name, "record source closed");
                        break;
                    }
                },
            }
        }

        self.shutdown(pending).await
    }

    /// Filter and render one record
    fn process(&mut self, record: EventRecord) -> Option<Bytes> {
        self.metrics.record_received();

        if !self.filter.matches(&record) {
            self.metrics.record_skipped();
            return None;
        }

        let formatted = self.stage.format(&record);
        self.metrics.record_rendered(formatted.unresolved);
        Some(formatted.line)
    }

    async fn on_trigger(&mut self, fired: Option<u64>) {
        let Some(seq) = fired else {
            warn!(pipeline = %self.name, "rotation trigger closed, rotation on trigger disabled");
            self.subscription = None;
            return;
        };

        self.metrics.record_rotation_triggered();
        debug!(pipeline = %self.name, seq, "rotation triggered");

        // The sink logs failed reopens and stays detached until the next rotation
        if let Err(e) = self.sink.rotate().await {
            debug!(pipeline = %self.name, error = %e, "triggered rotation failed");
        }
    }

    async fn shutdown(mut self, mut pending: Option<Bytes>) -> StopReport {
        self.records.close();

        let mut undelivered = 0u64;
        loop {
            if let Some(line) = pending.take() {
                self.deliver_final(line, &mut undelivered).await;
            }
            match self.records.recv().await {
                Some(record) => pending = self.process(record),
                None => break,
            }
        }

        let closed_cleanly = self.sink.close().await.is_ok();
        drop(self.subscription.take());

        // Lines the sink accepted but could never hand to an output
        let sink = self.sink.metrics();
        undelivered += sink.lines_dropped;

        if undelivered > 0 {
            error!(
                pipeline = %self.name,
                undelivered,
                "access log stopped with lines the output never accepted"
            );
        }

        let report = StopReport {
            metrics: self.metrics.snapshot(),
            sink,
            undelivered,
            closed_cleanly,
        };

        info!(
            pipeline = %self.name,
            records_received = report.metrics.records_received,
            lines_written = report.metrics.lines_written,
            rotations = report.sink.rotations,
            undelivered,
            "access log pipeline stopped"
        );

        report
    }

    /// Write one line during shutdown; after the first failure only count
    async fn deliver_final(&self, line: Bytes, undelivered: &mut u64) {
        if *undelivered > 0 {
            *undelivered += 1;
            return;
        }
        match self.sink.write(line).await {
            Ok(()) => self.metrics.record_written(),
            Err(_) => *undelivered += 1,
        }
    }
}

/// Next firing, or never when not subscribed
async fn next_trigger(subscription: &mut Option<TriggerSubscription>) -> Option<u64> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod coordinator_test;
