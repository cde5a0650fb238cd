use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::Span;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "mathsage.log";

/// Holds the file writer's worker and the id shared by every event of this
/// run. Drop it last so buffered lines are flushed.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Root span for one tutoring invocation; gateway and tutor spans nest
    /// under it so a run can be pulled out of the shared log by `run_id`.
    pub fn invocation_span(&self) -> Span {
        tracing::info_span!(target: "tutor", "invocation", run_id = %self.run_id)
    }
}

pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = build_env_filter(&config.filter)?;
    let log_dir = resolve_log_dir(&config.dir)?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(match config.rotation {
            LoggingRotation::Daily => Rotation::DAILY,
            LoggingRotation::Hourly => Rotation::HOURLY,
        })
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(retained_file_count(config.rotation, config.retention_days))
        .build(&log_dir)
        .with_context(|| format!("failed to open log files in {}", log_dir.display()))?;
    let (writer, worker_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter);
    let stderr_layer = config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        filter = %config.filter,
        rotation = ?config.rotation,
        retention_days = config.retention_days,
        "logging_initialized"
    );

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
    })
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    if filter.trim().is_empty() {
        bail!("logging.filter cannot be empty");
    }
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse logging.filter '{filter}'"))
}

/// Files kept by the appender so that roughly `retention_days` of history
/// survives at the configured rotation.
fn retained_file_count(rotation: LoggingRotation, retention_days: usize) -> usize {
    let per_day = match rotation {
        LoggingRotation::Daily => 1,
        LoggingRotation::Hourly => 24,
    };
    retention_days.saturating_mul(per_day).max(1)
}

fn resolve_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.as_os_str().is_empty() {
        bail!("logging.dir cannot be empty");
    }
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("failed to read current working directory for logging.dir")?
        .join(dir))
}
