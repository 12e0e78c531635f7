use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const UNTAGGED: &str = "(untagged)";

/// One logged span of work. `end == None` means the interval is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub label: String,
}

impl Interval {
    pub fn open(start: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            start,
            end: None,
            label: label.into(),
        }
    }

    pub fn closed(start: DateTime<Utc>, end: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            start,
            end: Some(end),
            label: label.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    pub fn end_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end.unwrap_or(now)
    }

    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.end_or(now) - self.start
    }

    /// Whitespace-delimited `#word` tokens, without the leading `#`.
    pub fn tags(&self) -> Vec<&str> {
        self.label
            .split_whitespace()
            .filter_map(|word| word.strip_prefix('#'))
            .filter(|tag| !tag.is_empty())
            .collect()
    }

    /// Tags used for grouping; falls back to the synthetic `(untagged)` bucket.
    pub fn tags_or_untagged(&self) -> Vec<&str> {
        let tags = self.tags();
        if tags.is_empty() { vec![UNTAGGED] } else { tags }
    }

    pub fn tags_line(&self) -> String {
        let tags = self.tags();
        if tags.is_empty() {
            UNTAGGED.to_string()
        } else {
            tags.join(", ")
        }
    }
}

/// Every tag used in `intervals`, sorted and without duplicates.
pub fn known_tags(intervals: &[Interval]) -> Vec<String> {
    intervals
        .iter()
        .flat_map(Interval::tags)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverrideError {
    #[error("only one @HH:MM start time is supported")]
    TooManyTimes,
    #[error("invalid time: {0}")]
    InvalidTime(String),
}

/// A label with an optional `@HH:MM` start time pulled out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub start: Option<NaiveTime>,
    pub label: String,
}

/// Splits `@H:MM` / `@HH:MM` words out of `text`. The remaining words are
/// rejoined with single spaces.
pub fn parse_start_request(text: &str) -> Result<StartRequest, OverrideError> {
    let mut start = None;
    let mut words = Vec::new();
    for word in text.split_whitespace() {
        let Some(raw) = word.strip_prefix('@').filter(|raw| looks_like_time(raw)) else {
            words.push(word);
            continue;
        };
        if start.is_some() {
            return Err(OverrideError::TooManyTimes);
        }
        let time = NaiveTime::parse_from_str(raw, "%H:%M")
            .map_err(|_| OverrideError::InvalidTime(raw.to_string()))?;
        start = Some(time);
    }
    Ok(StartRequest {
        start,
        label: words.join(" "),
    })
}

// One or two hour digits, a colon, two minute digits.
fn looks_like_time(raw: &str) -> bool {
    let Some((hours, minutes)) = raw.split_once(':') else {
        return false;
    };
    (1..=2).contains(&hours.len())
        && minutes.len() == 2
        && hours.chars().chain(minutes.chars()).all(|c| c.is_ascii_digit())
}

/// `HH:MM`, hours are not wrapped at 24.
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    format!("{hours:02}:{minutes:02}")
}

/// `HH:MM:SS`, used for the live elapsed counter.
pub fn format_elapsed(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
