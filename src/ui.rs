use std::fmt::Display;
use std::io;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, Local, SubsecRound, TimeZone, Utc};
use crossterm::cursor;
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::debug;

use crate::aggregate::{EntryRow, rows_for_range, top, total};
use crate::app::{Dashboard, Flow, NoticeKind, PanelId, Phase, TopRange};
use crate::config::{Config, GroupBy, KeyBindings};
use crate::domain::{Interval, format_duration, format_elapsed};
use crate::input::{CrosstermInput, KeySource};
use crate::layout::DashboardLayout;
use crate::panel::{Panel, centered, inner_height};
use crate::storage::{IntervalStore, find_open};
use crate::theme::{Role, Theme};
use crate::window::{Window, day_window, week_window};

const GAUGE_MAX_WIDTH: usize = 40;
const HELP_WIDTH: u16 = 60;

/// Raw mode plus alternate screen, released on drop even when unwinding.
struct TerminalGuard;

impl TerminalGuard {
	fn enter() -> io::Result<Self> {
		enable_raw_mode()?;
		if let Err(err) = execute!(io::stdout(), EnterAlternateScreen) {
			let _ = disable_raw_mode();
			return Err(err);
		}
		debug!("terminal acquired");
		Ok(Self)
	}
}

impl Drop for TerminalGuard {
	fn drop(&mut self) {
		restore_terminal();
		debug!("terminal restored");
	}
}

fn restore_terminal() {
	let _ = disable_raw_mode();
	let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
}

fn install_panic_hook() {
	let previous = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		restore_terminal();
		previous(info);
	}));
}

pub fn run_dashboard<S: IntervalStore>(store: &S, config: Config) -> anyhow::Result<()> {
	let mut dashboard = Dashboard::load(config, store).context("loading interval log")?;

	install_panic_hook();
	let _guard = TerminalGuard::enter().context("preparing terminal")?;
	let backend = CrosstermBackend::new(io::stdout());
	let mut terminal = Terminal::new(backend).context("creating terminal")?;

	run_event_loop(
		&mut terminal,
		&mut CrosstermInput,
		store,
		&mut dashboard,
		&Theme::default(),
		Local::now,
	)
}

/// Draw, wait, dispatch, until the dashboard asks to quit.
///
/// The wait is bounded while idle so the elapsed counter keeps moving, and
/// unbounded while a prompt is open.
pub fn run_event_loop<B, K, S, Tz, F>(
	terminal: &mut Terminal<B>,
	keys: &mut K,
	store: &S,
	dashboard: &mut Dashboard,
	theme: &Theme,
	clock: F,
) -> anyhow::Result<()>
where
	B: Backend,
	K: KeySource,
	S: IntervalStore,
	Tz: TimeZone,
	Tz::Offset: Display,
	F: Fn() -> DateTime<Tz>,
{
	loop {
		let now = clock().trunc_subsecs(0);
		terminal
			.draw(|frame| draw_dashboard(frame, dashboard, theme, &now))
			.map_err(|err| anyhow!("drawing dashboard: {err}"))?;

		let input = keys
			.next_input(dashboard.wait_timeout())
			.context("reading terminal input")?;
		let acted_at = clock().trunc_subsecs(0);
		if dashboard.handle(input, store, acted_at)? == Flow::Quit {
			break;
		}
	}

	Ok(())
}

fn draw_dashboard<Tz>(frame: &mut Frame, dashboard: &mut Dashboard, theme: &Theme, now: &DateTime<Tz>)
where
	Tz: TimeZone,
	Tz::Offset: Display,
{
	let layout = DashboardLayout::compute(frame.area());
	let gauge_width = usize::from(layout.goals.width.saturating_sub(10)).min(GAUGE_MAX_WIDTH);
	let view = build_view(dashboard, theme, now, gauge_width);

	for (panel, area, rows) in [
		(PanelId::Day, layout.day, view.day.len()),
		(PanelId::Week, layout.week, view.week.len()),
		(PanelId::Top, layout.top, view.top.len()),
	] {
		dashboard.clamp_scroll(panel, rows, inner_height(area));
	}

	let buf = frame.buffer_mut();
	Panel::new("Status", view.status)
		.border_style(theme.border(false))
		.render(layout.status, buf);
	for (panel, area, title, lines) in [
		(PanelId::Day, layout.day, view.day_title, view.day),
		(PanelId::Week, layout.week, view.week_title, view.week),
		(PanelId::Top, layout.top, view.top_title, view.top),
	] {
		Panel::new(title, lines)
			.border_style(theme.border(dashboard.focused() == Some(panel)))
			.scrolled(dashboard.scroll_offset(panel))
			.render(area, buf);
	}
	Panel::new("Current task", view.current)
		.border_style(theme.border(false))
		.wrapped()
		.render(layout.current, buf);
	Panel::new("Goals", view.goals)
		.border_style(theme.border(false))
		.render(layout.goals, buf);

	let screen = frame.area();
	let footer = Paragraph::new(Line::styled(footer_help(dashboard), theme.style(Role::Dim)));
	frame.render_widget(footer, layout.footer.intersection(screen));

	match dashboard.phase() {
		Phase::Prompting(prompt) => {
			if let Some(position) = prompt.render(screen, frame.buffer_mut(), theme) {
				frame.set_cursor_position(position);
			}
		}
		Phase::Help => {
			let lines = help_lines(&dashboard.config().keys, theme);
			let popup = centered(screen, HELP_WIDTH, lines.len() as u16 + 2);
			frame.render_widget(Clear, popup);
			Panel::new("Help", lines)
				.border_style(theme.border(true))
				.render(popup, frame.buffer_mut());
		}
		Phase::Idle => {}
	}
}

fn help_lines(keys: &KeyBindings, theme: &Theme) -> Vec<Line<'static>> {
	let heading = |text: &str| Line::styled(text.to_string(), theme.style(Role::Selection));
	vec![
		heading("Navigation"),
		Line::from("  Tab / Shift-Tab   focus next / previous panel"),
		Line::from("  ↑↓ / j k          scroll focused panel"),
		Line::from(""),
		heading("Actions"),
		Line::from(format!("  {}                 start an entry", keys.start)),
		Line::from(format!("  {}                 stop the running entry", keys.stop)),
		Line::from(format!("  {}                 reload the log", keys.reload)),
		Line::from(format!("  {}                 top list: week / today", keys.toggle_range)),
		Line::from(format!("  {} / Esc           quit", keys.quit)),
		Line::from(""),
		heading("Start times"),
		Line::from("  Fix bug @9:30     started at 09:30 today"),
		Line::from(""),
		heading("Tags"),
		Line::from("  #word             typing # suggests known tags"),
		Line::from("  ↑↓ then Tab       pick and insert a suggestion"),
		Line::from(""),
		Line::styled(format!("Esc/{}/{} to close", keys.quit, keys.help), theme.style(Role::Dim)),
	]
}

/// Text content of every panel for one frame.
struct DashboardView {
	status: Vec<Line<'static>>,
	day_title: String,
	day: Vec<Line<'static>>,
	week_title: String,
	week: Vec<Line<'static>>,
	top_title: String,
	top: Vec<Line<'static>>,
	current: Vec<Line<'static>>,
	goals: Vec<Line<'static>>,
}

fn build_view<Tz>(dashboard: &Dashboard, theme: &Theme, now: &DateTime<Tz>, gauge_width: usize) -> DashboardView
where
	Tz: TimeZone,
	Tz::Offset: Display,
{
	let config = dashboard.config();
	let intervals = dashboard.intervals();
	let now_utc = now.with_timezone(&Utc);
	let tz = now.timezone();

	let day = day_window(now);
	let week = week_window(now, config.week_start.weekday());
	let day_total = total(intervals, &day, now_utc);
	let week_total = total(intervals, &week, now_utc);
	let running = find_open(intervals).map(|index| &intervals[index]);

	let day_rows = rows_for_range(intervals, &day, now_utc, &tz, config.entry_order);
	let week_rows = rows_for_range(intervals, &week, now_utc, &tz, config.entry_order);

	let top_window = match dashboard.top_range() {
		TopRange::Week => week,
		TopRange::Day => day,
	};
	let ranked = top(intervals, &top_window, now_utc, config.group_top_by, config.top_limit);
	let grouping = match config.group_top_by {
		GroupBy::Tag => "tags",
		GroupBy::Label => "labels",
	};

	let mut top_lines = ranked
		.iter()
		.map(|row| Line::from(format!("{} {}", format_duration(row.duration), row.key)))
		.collect::<Vec<_>>();
	if top_lines.is_empty() {
		top_lines.push(Line::styled("Nothing tracked yet.", theme.style(Role::Dim)));
	}

	let notice = dashboard.notice(now_utc).map(|notice| {
		let role = match notice.kind {
			NoticeKind::Success => Role::Success,
			NoticeKind::Error => Role::Error,
			NoticeKind::Neutral => Role::Dim,
		};
		Line::styled(notice.text.clone(), theme.style(role))
	});

	DashboardView {
		status: status_lines(running, now, theme),
		day_title: format!("Today {}", format_duration(day_total)),
		day: entry_lines(&day_rows, false, theme, "No entries today."),
		week_title: format!("This week {}", format_duration(week_total)),
		week: entry_lines(&week_rows, true, theme, "No entries this week."),
		top_title: format!("Top {grouping}, {}", dashboard.top_range().label()),
		top: top_lines,
		current: current_lines(intervals, running, &day, now, theme),
		goals: goal_lines(
			[
				("Today", day_total, config.daily_target()),
				("Week", week_total, config.weekly_target()),
			],
			notice,
			gauge_width,
			theme,
		),
	}
}

fn status_lines<Tz>(running: Option<&Interval>, now: &DateTime<Tz>, theme: &Theme) -> Vec<Line<'static>>
where
	Tz: TimeZone,
	Tz::Offset: Display,
{
	let clock = Span::styled(format!("  {}", now.format("%a %d %b %H:%M")), theme.style(Role::Dim));
	let line = match running {
		Some(interval) => Line::from(vec![
			Span::styled(" WORKING ", theme.style(Role::RunningBadge)),
			Span::raw(format!(" {}", format_elapsed(interval.duration(now.with_timezone(&Utc))))),
			clock,
		]),
		None => Line::from(vec![
			Span::styled(" IDLE ", theme.style(Role::IdleBadge)),
			Span::styled(" no entry running", theme.style(Role::IdleText)),
			clock,
		]),
	};
	vec![line]
}

fn entry_lines<Tz>(rows: &[EntryRow<Tz>], with_day: bool, theme: &Theme, empty: &str) -> Vec<Line<'static>>
where
	Tz: TimeZone,
	Tz::Offset: Display,
{
	if rows.is_empty() {
		return vec![Line::styled(empty.to_string(), theme.style(Role::Dim))];
	}

	rows.iter()
		.map(|row| {
			let day = if with_day {
				row.start.format("%a ").to_string()
			} else {
				String::new()
			};
			let end = if row.running {
				"now".to_string()
			} else {
				row.end.format("%H:%M").to_string()
			};
			let text = format!(
				"{day}{}-{end:<5} {} {}",
				row.start.format("%H:%M"),
				format_duration(row.duration),
				row.label
			);
			if row.running {
				Line::styled(text, theme.style(Role::Success))
			} else {
				Line::from(text)
			}
		})
		.collect()
}

fn current_lines<Tz>(
	intervals: &[Interval],
	running: Option<&Interval>,
	today: &Window,
	now: &DateTime<Tz>,
	theme: &Theme,
) -> Vec<Line<'static>>
where
	Tz: TimeZone,
	Tz::Offset: Display,
{
	let tz = now.timezone();
	let local_time = |instant: DateTime<Utc>| {
		let local = instant.with_timezone(&tz);
		if today.contains(instant) {
			local.format("%H:%M").to_string()
		} else {
			local.format("%a %d %b %H:%M").to_string()
		}
	};

	if let Some(interval) = running {
		return vec![
			Line::from(interval.label.clone()),
			Line::from(""),
			Line::from(format!("Started {}", local_time(interval.start))),
			Line::styled(
				format!("Elapsed {}", format_elapsed(interval.duration(now.with_timezone(&Utc)))),
				theme.style(Role::Success),
			),
			Line::from(format!("Tags: {}", interval.tags_line())),
		];
	}

	let mut lines = vec![Line::styled("Nothing running.", theme.style(Role::IdleText))];
	if let Some(last) = intervals.iter().rev().find(|interval| !interval.is_open()) {
		let end = last.end_or(last.start);
		lines.push(Line::from(""));
		lines.push(Line::from(format!("Last: {}", last.label)));
		lines.push(Line::styled(
			format!("Ended {} after {}", local_time(end), format_duration(end - last.start)),
			theme.style(Role::Dim),
		));
	}
	lines
}

fn goal_lines(
	goals: [(&str, Duration, Duration); 2],
	notice: Option<Line<'static>>,
	gauge_width: usize,
	theme: &Theme,
) -> Vec<Line<'static>> {
	let mut lines = Vec::new();
	for (name, done, target) in goals {
		let left = (target - done).max(Duration::zero());
		lines.push(Line::from(format!(
			"{name:<6}{} of {}, {} left",
			format_duration(done),
			format_duration(target),
			format_duration(left)
		)));
		lines.push(Line::styled(progress_bar(done, target, gauge_width), theme.style(Role::Gauge)));
	}
	lines.extend(notice);
	lines
}

/// Text gauge such as `██████░░░░ 60%`; a zero target counts as met.
fn progress_bar(done: Duration, target: Duration, width: usize) -> String {
	let done = done.num_seconds().max(0);
	let target = target.num_seconds().max(0);
	let percent = if target == 0 { 100 } else { done * 100 / target };
	let filled = if target == 0 {
		width
	} else {
		(done.min(target) as usize * width) / target as usize
	};
	format!("{}{} {percent}%", "█".repeat(filled), "░".repeat(width - filled))
}

fn footer_help(dashboard: &Dashboard) -> String {
	let keys = &dashboard.config().keys;
	match dashboard.phase() {
		Phase::Prompting(_) => "Enter confirm | Esc cancel | ↑↓ Tab tags | @HH:MM start time".to_string(),
		Phase::Help => format!("Esc/{}/{} close help", keys.quit, keys.help),
		Phase::Idle => format!(
			"{} start | {} stop | {} reload | {} top range | Tab focus | ↑↓/jk scroll | {} help | {} quit",
			keys.start, keys.stop, keys.reload, keys.toggle_range, keys.help, keys.quit
		),
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration as StdDuration;

	use chrono::{DateTime, Duration, TimeZone, Utc};
	use crossterm::event::KeyCode;
	use ratatui::Terminal;
	use ratatui::backend::TestBackend;

	use super::{draw_dashboard, progress_bar, run_event_loop};
	use crate::app::Dashboard;
	use crate::config::{Config, GroupBy};
	use crate::domain::Interval;
	use crate::input::Input;
	use crate::input::scripted::{ScriptedInput, chars, key};
	use crate::panel::testing::screen_text;
	use crate::storage::StorageError;
	use crate::storage::memory::{Failing, FailingStore, MemoryStore};
	use crate::theme::Theme;

	fn at(hour: u32, minute: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 6, 10, hour, minute, 0).unwrap()
	}

	fn render(dashboard: &mut Dashboard, width: u16, height: u16, now: DateTime<Utc>) -> String {
		let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
		terminal
			.draw(|frame| draw_dashboard(frame, dashboard, &Theme::default(), &now))
			.unwrap();
		screen_text(terminal.backend().buffer())
	}

	#[test]
	fn running_entry_drives_every_panel() {
		let store = MemoryStore::with(vec![Interval::open(at(9, 0), "Write docs #project")]);
		let mut dashboard = Dashboard::load(Config::default(), &store).unwrap();
		let screen = render(&mut dashboard, 100, 30, at(9, 45));

		assert!(screen.contains("WORKING"));
		assert!(screen.contains("Today 00:45"));
		assert!(screen.contains("09:00-now"));
		assert!(screen.contains("Top tags, this week"));
		assert!(screen.contains("00:45 project"));
		assert!(screen.contains("Elapsed 00:45:00"));
		assert!(screen.contains("Tags: project"));
		assert!(screen.contains("00:45 of 08:00, 07:15 left"));
	}

	#[test]
	fn idle_screen_shows_last_closed_entry() {
		let store = MemoryStore::with(vec![Interval::closed(at(8, 0), at(9, 0), "Standup #team")]);
		let config = Config {
			group_top_by: GroupBy::Label,
			..Config::default()
		};
		let mut dashboard = Dashboard::load(config, &store).unwrap();
		let screen = render(&mut dashboard, 100, 30, at(9, 30));

		assert!(screen.contains("IDLE"));
		assert!(screen.contains("Nothing running."));
		assert!(screen.contains("Last: Standup #team"));
		assert!(screen.contains("Ended 09:00 after 01:00"));
		assert!(screen.contains("Top labels, this week"));
		assert!(screen.contains("01:00 Standup #team"));
	}

	#[test]
	fn prompt_overlay_and_help_replace_normal_footer() {
		let store = MemoryStore::default();
		let mut dashboard = Dashboard::load(Config::default(), &store).unwrap();
		dashboard.handle(key(KeyCode::Char('n')), &store, at(9, 0)).unwrap();
		let screen = render(&mut dashboard, 100, 30, at(9, 0));

		assert!(screen.contains("Start entry"));
		assert!(screen.contains("Enter confirm | Esc cancel"));
	}

	#[test]
	fn tiny_terminal_renders_without_panicking() {
		let store = MemoryStore::with(vec![Interval::open(at(9, 0), "Write docs #project")]);
		let mut dashboard = Dashboard::load(Config::default(), &store).unwrap();
		for (width, height) in [(10, 3), (1, 1), (30, 5), (200, 4)] {
			render(&mut dashboard, width, height, at(9, 45));
		}
		dashboard.handle(key(KeyCode::Char('n')), &store, at(9, 45)).unwrap();
		render(&mut dashboard, 10, 3, at(9, 45));
	}

	#[test]
	fn loop_blocks_while_prompting_and_ticks_while_idle() {
		let store = MemoryStore::default();
		let mut dashboard = Dashboard::load(Config::default(), &store).unwrap();
		let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
		let mut script = vec![Input::Tick, key(KeyCode::Char('n'))];
		script.extend(chars("Fix"));
		script.push(key(KeyCode::Esc));
		script.push(key(KeyCode::Char('q')));
		let mut keys = ScriptedInput::new(script);

		run_event_loop(&mut terminal, &mut keys, &store, &mut dashboard, &Theme::default(), || at(9, 0))
			.unwrap();

		let tick = Some(StdDuration::from_millis(1000));
		assert_eq!(keys.waits, vec![tick, tick, None, None, None, None, tick]);
		assert_eq!(store.write_count(), 0);
	}

	#[test]
	fn loop_records_started_entry() {
		let store = MemoryStore::default();
		let mut dashboard = Dashboard::load(Config::default(), &store).unwrap();
		let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
		let mut script = vec![key(KeyCode::Char('n'))];
		script.extend(chars("Deploy #ops"));
		script.push(key(KeyCode::Enter));
		script.push(key(KeyCode::Char('q')));
		let mut keys = ScriptedInput::new(script);

		run_event_loop(&mut terminal, &mut keys, &store, &mut dashboard, &Theme::default(), || at(10, 0))
			.unwrap();

		assert_eq!(store.snapshot(), vec![Interval::open(at(10, 0), "Deploy #ops")]);
	}

	#[test]
	fn exhausted_input_is_an_error_not_a_hang() {
		let store = MemoryStore::default();
		let mut dashboard = Dashboard::load(Config::default(), &store).unwrap();
		let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
		let mut keys = ScriptedInput::new(vec![Input::Tick]);
		let result = run_event_loop(&mut terminal, &mut keys, &store, &mut dashboard, &Theme::default(), || at(9, 0));
		assert!(result.is_err());
	}

	#[test]
	fn progress_bar_fills_proportionally() {
		assert_eq!(progress_bar(Duration::hours(2), Duration::hours(8), 8), "██░░░░░░ 25%");
		assert_eq!(progress_bar(Duration::hours(10), Duration::hours(8), 4), "████ 125%");
		assert_eq!(progress_bar(Duration::zero(), Duration::zero(), 2), "██ 100%");
	}

	#[test]
	fn help_overlay_lists_bindings_and_time_syntax() {
		let store = MemoryStore::default();
		let mut dashboard = Dashboard::load(Config::default(), &store).unwrap();
		dashboard.handle(key(KeyCode::Char('e')), &store, at(9, 0)).unwrap();
		let screen = render(&mut dashboard, 100, 30, at(9, 0));

		assert!(screen.contains("┌ Help "));
		assert!(screen.contains("start an entry"));
		assert!(screen.contains("@9:30"));
		assert!(screen.contains("Esc/q/e close help"));

		render(&mut dashboard, 12, 4, at(9, 0));
	}

	fn run_with_failing_store(store: &FailingStore, script: Vec<Input>) -> anyhow::Result<()> {
		let mut dashboard = Dashboard::load(Config::default(), &store.inner).unwrap();
		let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
		let mut keys = ScriptedInput::new(script);
		run_event_loop(&mut terminal, &mut keys, store, &mut dashboard, &Theme::default(), || at(9, 0))
	}

	#[test]
	fn reload_failure_ends_the_loop_with_the_store_error() {
		let store = FailingStore::new(MemoryStore::default(), Failing::Reads);
		let err = run_with_failing_store(&store, vec![key(KeyCode::Char('r')), key(KeyCode::Char('q'))])
			.expect_err("reload should fail");
		assert!(err.downcast_ref::<StorageError>().is_some());
	}

	#[test]
	fn start_failure_ends_the_loop_with_the_store_error() {
		let store = FailingStore::new(MemoryStore::default(), Failing::Appends);
		let mut script = vec![key(KeyCode::Char('n'))];
		script.extend(chars("Deploy"));
		script.push(key(KeyCode::Enter));
		script.push(key(KeyCode::Char('q')));

		let err = run_with_failing_store(&store, script).expect_err("start should fail");
		assert!(err.downcast_ref::<StorageError>().is_some());
		assert!(store.inner.snapshot().is_empty());
	}

	#[test]
	fn stop_failure_ends_the_loop_with_the_store_error() {
		let running = MemoryStore::with(vec![Interval::open(at(8, 0), "Review")]);
		let store = FailingStore::new(running, Failing::Rewrites);
		let err = run_with_failing_store(&store, vec![key(KeyCode::Char('x')), key(KeyCode::Char('q'))])
			.expect_err("stop should fail");
		assert!(err.downcast_ref::<StorageError>().is_some());
		assert!(store.inner.snapshot()[0].is_open());
	}
}
