use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{Duration, Weekday};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config {path}: {field} = {value} is out of range")]
    OutOfRange {
        path: PathBuf,
        field: &'static str,
        value: String,
    },
}

/// How the top-ranking panel buckets time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Tag,
    Label,
}

/// Sort direction of the entries-in-range panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelBehavior {
    #[default]
    Scrollable,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub start: char,
    pub stop: char,
    pub reload: char,
    pub quit: char,
    pub toggle_range: char,
    pub help: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            start: 'n',
            stop: 'x',
            reload: 'r',
            quit: 'q',
            toggle_range: 'v',
            help: 'e',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Periodic redraw interval while idle. Expiry is a tick, never a cancellation.
    pub tick_ms: u64,
    pub notice_secs: u64,
    pub daily_target_minutes: i64,
    pub weekly_target_minutes: i64,
    pub week_start: WeekStart,
    pub top_limit: usize,
    pub group_top_by: GroupBy,
    pub entry_order: EntryOrder,
    pub panels: PanelBehavior,
    pub keys: KeyBindings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            notice_secs: 4,
            daily_target_minutes: 8 * 60,
            weekly_target_minutes: 40 * 60,
            week_start: WeekStart::Monday,
            top_limit: 6,
            group_top_by: GroupBy::Tag,
            entry_order: EntryOrder::NewestFirst,
            panels: PanelBehavior::Scrollable,
            keys: KeyBindings::default(),
        }
    }
}

impl Config {
    pub fn tick(&self) -> StdDuration {
        StdDuration::from_millis(self.tick_ms.max(1))
    }

    pub fn notice_ttl(&self) -> Duration {
        seconds(self.notice_secs).unwrap_or(Duration::MAX)
    }

    pub fn daily_target(&self) -> Duration {
        minutes(self.daily_target_minutes).unwrap_or(Duration::MAX)
    }

    pub fn weekly_target(&self) -> Duration {
        minutes(self.weekly_target_minutes).unwrap_or(Duration::MAX)
    }

    pub fn from_toml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)
    }

    /// Rejects values that parse but cannot be represented as durations.
    fn validate(self, path: &Path) -> Result<Self, ConfigError> {
        let out_of_range = |field: &'static str, value: String| ConfigError::OutOfRange {
            path: path.to_path_buf(),
            field,
            value,
        };
        if seconds(self.notice_secs).is_none() {
            return Err(out_of_range("notice_secs", self.notice_secs.to_string()));
        }
        if minutes(self.daily_target_minutes).is_none() {
            return Err(out_of_range(
                "daily_target_minutes",
                self.daily_target_minutes.to_string(),
            ));
        }
        if minutes(self.weekly_target_minutes).is_none() {
            return Err(out_of_range(
                "weekly_target_minutes",
                self.weekly_target_minutes.to_string(),
            ));
        }
        Ok(self)
    }
}

fn seconds(value: u64) -> Option<Duration> {
    i64::try_from(value).ok().and_then(Duration::try_seconds)
}

// Negative targets count as zero.
fn minutes(value: i64) -> Option<Duration> {
    Duration::try_minutes(value.max(0))
}

/// Loads the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Config::from_toml(&raw, path)
}
