mod aggregate;
mod app;
mod config;
mod domain;
mod input;
mod layout;
mod logging;
mod panel;
mod paths;
mod prompt;
mod storage;
mod theme;
mod ui;
mod window;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, GroupBy, load_config};
use crate::logging::init_logging;
use crate::paths::{resolve_config_path, resolve_log_path};
use crate::storage::JsonlStore;
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "chronos-dashboard", about = "Live terminal dashboard for logged work time")]
struct Cli {
	/// Interval log (JSON lines). Defaults to $CHRONOS_DASHBOARD_LOG or ~/.chronos-dashboard/log.jsonl.
	#[arg(long)]
	log: Option<PathBuf>,
	/// Config file. Defaults to $CHRONOS_DASHBOARD_CONFIG or the platform config dir.
	#[arg(long)]
	config: Option<PathBuf>,
	/// Bucket the top list by tag or by full label.
	#[arg(long, value_enum)]
	group_by: Option<GroupBy>,
	/// Redraw interval while idle, in milliseconds.
	#[arg(long)]
	tick_ms: Option<u64>,
}

impl Cli {
	fn apply_overrides(&self, config: &mut Config) {
		if let Some(group_by) = self.group_by {
			config.group_top_by = group_by;
		}
		if let Some(tick_ms) = self.tick_ms {
			config.tick_ms = tick_ms;
		}
	}
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}

fn run() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let _log_guard = match init_logging() {
		Ok((path, guard)) => {
			tracing::debug!(path = %path.display(), "diagnostics enabled");
			Some(guard)
		}
		Err(err) => {
			eprintln!("warning: logging disabled: {err:#}");
			None
		}
	};

	let config_path = resolve_config_path(cli.config.clone());
	let mut config = load_config(&config_path)?;
	cli.apply_overrides(&mut config);

	let store = JsonlStore::new(resolve_log_path(cli.log.clone()));
	tracing::info!(log = %store.path().display(), "starting dashboard");
	run_dashboard(&store, config)
}
