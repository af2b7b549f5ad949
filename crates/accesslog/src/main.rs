//! accesslog - Apache-style access log writer
//!
//! Reads JSON event records from stdin, one per line, and appends a rendered
//! access log line for every response to the configured target. Sending
//! SIGHUP reopens the target file so external tools can rotate it.
//!
//! # Usage
//!
//! ```bash
//! # Configured by file
//! app | accesslog --config configs/accesslog.toml
//!
//! # Configured by flags
//! app | accesslog --output /var/log/app/access.log --pattern '%h "%r" %>s'
//!
//! # Rotate
//! mv /var/log/app/access.log /var/log/app/access.log.1 && kill -HUP $(pidof accesslog)
//! ```

mod run;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use accesslog_config::{AccessLogTarget, Config, LogConfig, LogFormat, LogOutput};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// accesslog - Apache-style access log writer
#[derive(Parser, Debug)]
#[command(name = "accesslog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Access log target: a file path, "stdout" or "stderr". Overrides config file.
    #[arg(short, long)]
    output: Option<String>,

    /// Format string or "combined". Overrides config file.
    #[arg(short, long)]
    pattern: Option<String>,

    /// Ignore SIGHUP instead of reopening the target
    #[arg(long)]
    no_rotate: bool,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
    init_logging(&log_level, &config.log)?;

    run::run(config, cli.config.as_deref()).await
}

/// Load the config file, if any, and apply command line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("config file not found: {}", path.display()));
            }
            Config::from_file(path).context("failed to load configuration")?
        }
        None => Config::default(),
    };

    if let Some(output) = &cli.output {
        config.access_log.target = Some(AccessLogTarget::from(output.as_str()));
    }
    if let Some(pattern) = &cli.pattern {
        config.access_log.pattern = pattern.clone();
    }
    if cli.no_rotate {
        config.access_log.rotate_on_signal = false;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for diagnostic logging
fn init_logging(level: &str, log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = log_writer(&log.output)?;
    let layer = match log.format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(log.output.is_stream())
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();

    Ok(())
}

fn log_writer(output: &LogOutput) -> Result<BoxMakeWriter> {
    Ok(match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File(path) => BoxMakeWriter::new(Arc::new(open_log_file(Path::new(path))?)),
    })
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("accesslog").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_cli_flags() {
        let cli = parse(&["--output", "/tmp/a.log", "-p", "%s", "--no-rotate", "-l", "debug"]);
        assert_eq!(cli.output.as_deref(), Some("/tmp/a.log"));
        assert_eq!(cli.pattern.as_deref(), Some("%s"));
        assert!(cli.no_rotate);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_flags_without_config_file() {
        let config = load_config(&parse(&["--output", "stdout", "--pattern", "%h"])).unwrap();
        assert_eq!(config.access_log.target, Some(AccessLogTarget::Stdout));
        assert_eq!(config.access_log.pattern, "%h");
        assert!(config.access_log.rotate_on_signal);
    }

    #[test]
    fn test_target_is_required() {
        let err = load_config(&parse(&[])).unwrap_err();
        assert!(format!("{err:#}").contains("target"));
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(&parse(&["--config", "/nonexistent/accesslog.toml"])).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[log]
level = "warn"

[access_log]
target = "/var/log/a.log"
pattern = "%s"
"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = load_config(&parse(&["-c", path])).unwrap();
        assert_eq!(
            config.access_log.target,
            Some(AccessLogTarget::File("/var/log/a.log".into()))
        );
        assert_eq!(config.access_log.pattern, "%s");

        let config = load_config(&parse(&["-c", path, "-o", "stderr", "--no-rotate"])).unwrap();
        assert_eq!(config.access_log.target, Some(AccessLogTarget::Stderr));
        assert_eq!(config.access_log.pattern, "%s");
        assert!(!config.access_log.rotate_on_signal);
    }

    #[test]
    fn test_resolve_log_level() {
        let mut config = Config::default();
        assert_eq!(resolve_log_level(None, &config), "info");

        config.log.level = accesslog_config::LogLevel::Warn;
        assert_eq!(resolve_log_level(None, &config), "warn");
        assert_eq!(resolve_log_level(Some("trace"), &config), "trace");
    }

    #[test]
    fn test_log_file_writer_opens_in_append_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.log");
        std::fs::write(&path, "existing\n").unwrap();

        assert!(log_writer(&LogOutput::File(path.display().to_string())).is_ok());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\n");
        assert!(log_writer(&LogOutput::File("/nonexistent/dir/diag.log".into())).is_err());
    }
}
