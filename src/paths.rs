use std::env;
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "chronos-dashboard";
const LOG_FILE: &str = "log.jsonl";
const CONFIG_FILE: &str = "config.toml";

pub const LOG_ENV: &str = "CHRONOS_DASHBOARD_LOG";
pub const CONFIG_ENV: &str = "CHRONOS_DASHBOARD_CONFIG";

/// Interval log location: flag, then `CHRONOS_DASHBOARD_LOG`, then `~/.chronos-dashboard/log.jsonl`.
pub fn resolve_log_path(cli_path: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = non_empty_env(LOG_ENV) {
		return absolutize(path);
	}

	home_dir().join(format!(".{APP_DIR}")).join(LOG_FILE)
}

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = non_empty_env(CONFIG_ENV) {
		return absolutize(path);
	}

	dirs::config_dir()
		.unwrap_or_else(home_dir)
		.join(APP_DIR)
		.join(CONFIG_FILE)
}

/// Directory for the dashboard's own diagnostic logs.
pub fn diagnostics_dir() -> PathBuf {
	dirs::data_local_dir()
		.unwrap_or_else(|| home_dir().join(".local").join("share"))
		.join(APP_DIR)
		.join("logs")
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
	let value = env::var_os(key)?;
	if value.is_empty() {
		None
	} else {
		Some(PathBuf::from(value))
	}
}

fn home_dir() -> PathBuf {
	dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}
