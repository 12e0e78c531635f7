use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{debug, info};

use crate::config::{Config, PanelBehavior};
use crate::domain::{Interval, known_tags, parse_start_request};
use crate::input::{Command, Input, closes_help, command_for, edit_for};
use crate::panel::max_offset;
use crate::prompt::{Prompt, PromptResult};
use crate::storage::{IntervalStore, StorageError, find_open};
use crate::window::local_to_utc;

const START_PROMPT_TITLE: &str = "Start entry";
const SCROLLABLE_PANELS: [PanelId; 3] = [PanelId::Day, PanelId::Week, PanelId::Top];

/// Panels that can own scroll focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelId {
	Day,
	Week,
	Top,
}

impl PanelId {
	fn index(self) -> usize {
		match self {
			PanelId::Day => 0,
			PanelId::Week => 1,
			PanelId::Top => 2,
		}
	}
}

/// Window the top-ranking panel aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopRange {
	Week,
	Day,
}

impl TopRange {
	fn toggled(self) -> Self {
		match self {
			TopRange::Week => TopRange::Day,
			TopRange::Day => TopRange::Week,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			TopRange::Week => "this week",
			TopRange::Day => "today",
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
	offset: usize,
	max: usize,
}

impl ScrollState {
	pub fn offset(&self) -> usize {
		self.offset
	}

	fn scroll_by(&mut self, delta: isize) {
		self.offset = self.offset.saturating_add_signed(delta).min(self.max);
	}

	/// Records the viewport seen in the latest frame and pulls the offset back into range.
	fn clamp(&mut self, rows: usize, viewport: usize) {
		self.max = max_offset(rows, viewport);
		self.offset = self.offset.min(self.max);
	}

	fn reset(&mut self) {
		self.offset = 0;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
	Success,
	Error,
	Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
	pub text: String,
	pub kind: NoticeKind,
	pub posted_at: DateTime<Utc>,
}

/// Controller phase. Idle and help wait with a timeout; prompting blocks on input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
	Idle,
	Prompting(Prompt),
	Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	Continue,
	Quit,
}

/// Everything the dashboard remembers between frames.
#[derive(Debug)]
pub struct Dashboard {
	config: Config,
	intervals: Vec<Interval>,
	phase: Phase,
	focus: usize,
	scroll: [ScrollState; 3],
	top_range: TopRange,
	notice: Option<Notice>,
}

impl Dashboard {
	pub fn load<S: IntervalStore>(config: Config, store: &S) -> Result<Self, StorageError> {
		let intervals = store.read_all()?;
		debug!(count = intervals.len(), "loaded intervals");
		Ok(Self {
			config,
			intervals,
			phase: Phase::Idle,
			focus: 0,
			scroll: [ScrollState::default(); 3],
			top_range: TopRange::Week,
			notice: None,
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn intervals(&self) -> &[Interval] {
		&self.intervals
	}

	pub fn phase(&self) -> &Phase {
		&self.phase
	}

	pub fn top_range(&self) -> TopRange {
		self.top_range
	}

	/// How long the next wait for input may last. Prompting waits indefinitely.
	pub fn wait_timeout(&self) -> Option<StdDuration> {
		match self.phase {
			Phase::Idle | Phase::Help => Some(self.config.tick()),
			Phase::Prompting(_) => None,
		}
	}

	fn focusable(&self) -> &'static [PanelId] {
		match self.config.panels {
			PanelBehavior::Scrollable => &SCROLLABLE_PANELS,
			PanelBehavior::Static => &[],
		}
	}

	pub fn focused(&self) -> Option<PanelId> {
		self.focusable().get(self.focus).copied()
	}

	pub fn scroll_offset(&self, panel: PanelId) -> usize {
		match self.config.panels {
			PanelBehavior::Scrollable => self.scroll[panel.index()].offset(),
			PanelBehavior::Static => 0,
		}
	}

	pub fn clamp_scroll(&mut self, panel: PanelId, rows: usize, viewport: usize) {
		self.scroll[panel.index()].clamp(rows, viewport);
	}

	/// The latest notice, unless it has outlived its display time.
	pub fn notice(&self, now: DateTime<Utc>) -> Option<&Notice> {
		let ttl = self.config.notice_ttl();
		self.notice
			.as_ref()
			.filter(|notice| now - notice.posted_at < ttl)
	}

	fn notify(&mut self, text: impl Into<String>, kind: NoticeKind, now: DateTime<Utc>) {
		self.notice = Some(Notice {
			text: text.into(),
			kind,
			posted_at: now,
		});
	}

	/// Advances the state machine by one input. Store failures are returned as-is.
	///
	/// `now` carries the viewer's zone, which `@HH:MM` start times are read in.
	pub fn handle<S: IntervalStore, Tz: TimeZone>(
		&mut self,
		input: Input,
		store: &S,
		local_now: DateTime<Tz>,
	) -> Result<Flow, StorageError> {
		let now = local_now.with_timezone(&Utc);
		let key = match input {
			Input::Tick | Input::Resize => return Ok(Flow::Continue),
			Input::Key(key) => key,
		};

		match &mut self.phase {
			Phase::Prompting(prompt) => {
				let Some(edit) = edit_for(&key) else {
					return Ok(Flow::Continue);
				};
				if let Some(result) = prompt.apply(edit) {
					self.phase = Phase::Idle;
					self.finish_start(result, store, &local_now)?;
				}
				return Ok(Flow::Continue);
			}
			Phase::Help => {
				if closes_help(&key, &self.config.keys) {
					self.phase = Phase::Idle;
				}
				return Ok(Flow::Continue);
			}
			Phase::Idle => {}
		}

		let Some(command) = command_for(&key, &self.config.keys) else {
			return Ok(Flow::Continue);
		};
		match command {
			Command::Quit => return Ok(Flow::Quit),
			Command::ScrollUp => self.scroll_focused(-1),
			Command::ScrollDown => self.scroll_focused(1),
			Command::FocusNext => self.rotate_focus(1),
			Command::FocusPrev => self.rotate_focus(-1),
			Command::Start => {
				let prompt = Prompt::new(START_PROMPT_TITLE).with_tags(known_tags(&self.intervals));
				self.phase = Phase::Prompting(prompt);
			}
			Command::Help => self.phase = Phase::Help,
			Command::Stop => self.stop(store, now)?,
			Command::Reload => {
				self.reload(store)?;
				self.notify("Reloaded log.", NoticeKind::Neutral, now);
			}
			Command::ToggleRange => {
				self.top_range = self.top_range.toggled();
				self.scroll[PanelId::Top.index()].reset();
				let label = self.top_range.label();
				self.notify(format!("Top list: {label}"), NoticeKind::Neutral, now);
			}
		}
		Ok(Flow::Continue)
	}

	fn scroll_focused(&mut self, delta: isize) {
		if let Some(panel) = self.focused() {
			self.scroll[panel.index()].scroll_by(delta);
		}
	}

	fn rotate_focus(&mut self, delta: isize) {
		let count = self.focusable().len();
		if count == 0 {
			return;
		}
		self.focus = (self.focus as isize + delta).rem_euclid(count as isize) as usize;
	}

	fn reload<S: IntervalStore>(&mut self, store: &S) -> Result<(), StorageError> {
		self.intervals = store.read_all()?;
		debug!(count = self.intervals.len(), "reloaded intervals");
		Ok(())
	}

	fn finish_start<S: IntervalStore, Tz: TimeZone>(
		&mut self,
		result: PromptResult,
		store: &S,
		local_now: &DateTime<Tz>,
	) -> Result<(), StorageError> {
		let now = local_now.with_timezone(&Utc);
		if result.cancelled {
			self.notify("Start cancelled.", NoticeKind::Neutral, now);
			return Ok(());
		}
		if result.text.is_empty() {
			self.notify("Please enter a description.", NoticeKind::Error, now);
			return Ok(());
		}

		let intervals = store.read_all()?;
		if find_open(&intervals).is_some() {
			self.intervals = intervals;
			self.notify("An entry is already running.", NoticeKind::Error, now);
			return Ok(());
		}

		let request = match parse_start_request(&result.text) {
			Ok(request) => request,
			Err(err) => {
				self.notify(format!("Cannot start: {err}."), NoticeKind::Error, now);
				return Ok(());
			}
		};
		if request.label.is_empty() {
			self.notify("Please enter a description.", NoticeKind::Error, now);
			return Ok(());
		}
		let start = match request.start {
			Some(time) => local_to_utc(&local_now.timezone(), local_now.date_naive().and_time(time)),
			None => now,
		};
		if start > now {
			self.notify("Start time cannot be in the future.", NoticeKind::Error, now);
			return Ok(());
		}

		store.append(&Interval::open(start, request.label.clone()))?;
		info!(label = %request.label, start = %start, "started interval");
		self.reload(store)?;
		self.notify(format!("Started: {}", request.label), NoticeKind::Success, now);
		Ok(())
	}

	fn stop<S: IntervalStore>(&mut self, store: &S, now: DateTime<Utc>) -> Result<(), StorageError> {
		let mut intervals = store.read_all()?;
		let Some(index) = find_open(&intervals) else {
			self.intervals = intervals;
			self.notify("No active entry to stop.", NoticeKind::Error, now);
			return Ok(());
		};

		let start = intervals[index].start;
		let label = intervals[index].label.clone();
		let end = if now > start { now } else { start + Duration::minutes(1) };
		intervals[index] = Interval::closed(start, end, label.clone());

		store.write_all(&intervals)?;
		info!(label = %label, end = %end, "stopped interval");
		self.intervals = intervals;
		self.notify(format!("Stopped: {label}"), NoticeKind::Success, now);
		Ok(())
	}
}
