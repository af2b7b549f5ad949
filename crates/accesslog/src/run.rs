//! Run the access log writer until input ends or a shutdown signal arrives

use std::path::Path;
use std::sync::Arc;

use accesslog_config::{AccessLogConfig, Config};
use accesslog_pipeline::{JsonLinesSource, Pipeline, StopReport};
use accesslog_tap::HangupSignal;
use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub async fn run(config: Config, config_path: Option<&Path>) -> Result<()> {
    let access_log = &config.access_log;
    let target = access_log
        .target
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    let config_path = config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(flags)".to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        output = %target,
        pattern = %access_log.pattern,
        rotate_on_signal = access_log.rotate_on_signal,
        "accesslog starting"
    );

    let pipeline = Pipeline::from_config(access_log).context("failed to open access log")?;
    let pipeline = wire_hangup(pipeline, access_log, HangupSignal::global());

    let (tx, rx) = pipeline.channel();
    let handle = pipeline.start(rx).context("failed to start pipeline")?;

    let cancel = CancellationToken::new();
    let mut source = tokio::spawn(JsonLinesSource::new(tokio::io::stdin()).run(tx, cancel.clone()));

    let input_ended = tokio::select! {
        result = &mut source => {
            match result {
                Ok(Ok(stats)) => info!(
                    lines = stats.lines_read,
                    records = stats.records_sent,
                    malformed = stats.malformed_lines,
                    "input ended"
                ),
                Ok(Err(e)) => error!(error = %e, "failed to read input"),
                Err(e) => error!(error = %e, "input task panicked"),
            }
            true
        }
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping...");
            cancel.cancel();
            false
        }
    };

    let report = handle.stop().await.context("pipeline task failed")?;
    log_report(&report);
    let outcome = exit_status(&report);

    if !input_ended {
        // A blocked stdin read holds a runtime thread that cannot be
        // interrupted, so leave without waiting for it.
        info!("accesslog shutdown complete");
        if let Err(e) = &outcome {
            error!(error = %e, "accesslog stopped with errors");
        }
        std::process::exit(if outcome.is_ok() { 0 } else { 1 });
    }

    info!("accesslog shutdown complete");
    outcome
}

/// Install the SIGHUP listener, and subscribe the pipeline if it rotates
///
/// The listener goes in even with rotation off, otherwise SIGHUP would
/// terminate the writer and lose queued lines.
fn wire_hangup(
    pipeline: Pipeline,
    access_log: &AccessLogConfig,
    signal: Arc<HangupSignal>,
) -> Pipeline {
    if let Err(e) = signal.install_listener() {
        warn!(error = %e, "SIGHUP listener unavailable");
    }

    if !access_log.rotate_on_signal {
        info!("SIGHUP rotation disabled");
        return pipeline;
    }
    if !pipeline.sink().is_rotatable() {
        info!("target is a stream, SIGHUP rotation disabled");
        return pipeline;
    }
    pipeline.with_trigger(signal)
}

/// Fail the run if the output did not close or any line went undelivered
fn exit_status(report: &StopReport) -> Result<()> {
    match (report.closed_cleanly, report.undelivered) {
        (true, 0) => Ok(()),
        (true, lost) => Err(anyhow::anyhow!("{lost} access log lines were never delivered")),
        (false, 0) => Err(anyhow::anyhow!("failed to close the access log output")),
        (false, lost) => Err(anyhow::anyhow!(
            "failed to close the access log output, {lost} lines were never delivered"
        )),
    }
}

fn log_report(report: &StopReport) {
    let metrics = &report.metrics;
    let sink = &report.sink;

    info!(
        received = metrics.records_received,
        skipped = metrics.records_skipped,
        written = metrics.lines_written,
        bytes = sink.bytes_written,
        unresolved = metrics.unresolved_directives,
        rotations = sink.rotations,
        failed_rotations = sink.failed_rotations,
        "access log summary"
    );

    if report.undelivered > 0 {
        warn!(
            undelivered = report.undelivered,
            dropped_by_sink = sink.lines_dropped,
            write_errors = sink.write_errors,
            "access log lines were not delivered"
        );
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
