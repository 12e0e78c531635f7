use ratatui::style::{Color, Modifier, Style};

/// Semantic style roles used across the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	Selection,
	Error,
	Success,
	RunningBadge,
	IdleBadge,
	IdleText,
	Dim,
	Border,
	FocusedBorder,
	Gauge,
}

/// Immutable role → style table, built once and passed by reference.
#[derive(Debug, Clone)]
pub struct Theme {
	selection: Style,
	error: Style,
	success: Style,
	running_badge: Style,
	idle_badge: Style,
	idle_text: Style,
	dim: Style,
	border: Style,
	focused_border: Style,
	gauge: Style,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			selection: Style::default().fg(Color::Black).bg(Color::Cyan),
			error: Style::default().fg(Color::Red),
			success: Style::default().fg(Color::Green),
			running_badge: Style::default()
				.fg(Color::Black)
				.bg(Color::Green)
				.add_modifier(Modifier::BOLD),
			idle_badge: Style::default()
				.fg(Color::Black)
				.bg(Color::Yellow)
				.add_modifier(Modifier::BOLD),
			idle_text: Style::default().fg(Color::Yellow),
			dim: Style::default().fg(Color::DarkGray),
			border: Style::default().fg(Color::DarkGray),
			focused_border: Style::default()
				.fg(Color::Yellow)
				.add_modifier(Modifier::BOLD),
			gauge: Style::default().fg(Color::Cyan),
		}
	}
}

impl Theme {
	pub fn style(&self, role: Role) -> Style {
		match role {
			Role::Selection => self.selection,
			Role::Error => self.error,
			Role::Success => self.success,
			Role::RunningBadge => self.running_badge,
			Role::IdleBadge => self.idle_badge,
			Role::IdleText => self.idle_text,
			Role::Dim => self.dim,
			Role::Border => self.border,
			Role::FocusedBorder => self.focused_border,
			Role::Gauge => self.gauge,
		}
	}

	pub fn border(&self, focused: bool) -> Style {
		if focused {
			self.style(Role::FocusedBorder)
		} else {
			self.style(Role::Border)
		}
	}
}
