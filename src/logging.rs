use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::paths::diagnostics_dir;

pub const LOG_LEVEL_ENV: &str = "CHRONOS_DASHBOARD_LOG_LEVEL";
const FILE_PREFIX: &str = "chronos-dashboard-";

/// Diagnostics go to a file; the terminal belongs to the dashboard.
///
/// The returned guard flushes pending records when dropped, so keep it alive
/// until the program exits.
pub fn init_logging() -> anyhow::Result<(PathBuf, WorkerGuard)> {
    let log_dir = diagnostics_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let log_file_path = log_file_path(&log_dir);
    let file = fs::File::create(&log_file_path)
        .with_context(|| format!("creating log file {}", log_file_path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(build_log_filter())
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    tracing::info!(path = %log_file_path.display(), "logging initialized");
    Ok((log_file_path, guard))
}

fn build_log_filter() -> EnvFilter {
    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| normalize_log_level(&raw))
        .unwrap_or("warn");
    EnvFilter::new(format!("{level},chronos_dashboard={level}"))
}

fn normalize_log_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

fn log_file_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    log_dir.join(format!("{FILE_PREFIX}{timestamp}.log"))
}
