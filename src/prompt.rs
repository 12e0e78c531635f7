use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Widget};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::input::Edit;
use crate::panel::{Panel, centered};
use crate::theme::{Role, Theme};

const BOX_HEIGHT: u16 = 5;
const BOX_MIN_WIDTH: u16 = 50;
const SUGGESTION_LIMIT: usize = 5;

/// Result of a finished prompt. A cancelled prompt always carries empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptResult {
	pub text: String,
	pub cancelled: bool,
}

/// Single-line text capture shown as a modal box.
///
/// While the word under the cursor starts with `#`, known tags containing the
/// rest of that word are offered below the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
	title: String,
	buffer: String,
	tags: Vec<String>,
	suggestions: Vec<String>,
	selected: usize,
}

impl Prompt {
	pub fn new(title: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			buffer: String::new(),
			tags: Vec::new(),
			suggestions: Vec::new(),
			selected: 0,
		}
	}

	/// Tags offered as completions, without the leading `#`.
	pub fn with_tags(mut self, tags: Vec<String>) -> Self {
		self.tags = tags;
		self
	}

	pub fn buffer(&self) -> &str {
		&self.buffer
	}

	pub fn suggestions(&self) -> &[String] {
		&self.suggestions
	}

	pub fn selected(&self) -> Option<&str> {
		self.suggestions.get(self.selected).map(String::as_str)
	}

	/// Applies one edit; returns the result once the prompt is confirmed or cancelled.
	pub fn apply(&mut self, edit: Edit) -> Option<PromptResult> {
		match edit {
			Edit::Insert(value) => {
				self.buffer.push(value);
				self.refresh_suggestions();
				None
			}
			Edit::Backspace => {
				self.buffer.pop();
				self.refresh_suggestions();
				None
			}
			Edit::SelectPrev => {
				self.selected = self.selected.saturating_sub(1);
				None
			}
			Edit::SelectNext => {
				if self.selected + 1 < self.suggestions.len() {
					self.selected += 1;
				}
				None
			}
			Edit::Complete => {
				self.complete();
				None
			}
			Edit::Cancel => Some(PromptResult {
				text: String::new(),
				cancelled: true,
			}),
			Edit::Confirm => Some(PromptResult {
				text: self.buffer.trim().to_string(),
				cancelled: false,
			}),
		}
	}

	fn refresh_suggestions(&mut self) {
		self.selected = 0;
		self.suggestions = match tag_fragment(&self.buffer) {
			Some(fragment) => matching_tags(&self.tags, fragment),
			None => Vec::new(),
		};
	}

	fn complete(&mut self) {
		let Some(tag) = self.selected().map(str::to_string) else {
			return;
		};
		let Some(fragment) = tag_fragment(&self.buffer) else {
			return;
		};
		let keep = self.buffer.len() - fragment.len();
		self.buffer.truncate(keep);
		self.buffer.push_str(&tag);
		self.buffer.push(' ');
		self.suggestions.clear();
		self.selected = 0;
	}

	/// Draws the prompt box centered in `area` and returns where the cursor belongs.
	pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) -> Option<Position> {
		let area = area.intersection(buf.area);
		let title_width = u16::try_from(self.title.width()).unwrap_or(u16::MAX);
		let width = BOX_MIN_WIDTH.max(
			area.width
				.saturating_sub(4)
				.min(title_width.saturating_add(BOX_MIN_WIDTH)),
		);
		let height = BOX_HEIGHT + self.suggestions.len() as u16;
		let popup = centered(area, width, height);
		if popup.width < 4 || popup.height < 3 {
			return None;
		}

		let field_width = usize::from(popup.width - 4);
		let visible = tail(&self.buffer, field_width.saturating_sub(1));
		let cursor_x = popup.x + 2 + visible.width() as u16;
		let field_row = if popup.height >= BOX_HEIGHT { 2 } else { 1 };

		let mut lines = Vec::new();
		if field_row == 2 {
			lines.push(Line::from(""));
		}
		lines.push(Line::from(vec![
			Span::raw(" "),
			Span::styled(visible.to_string(), theme.style(Role::Selection)),
		]));
		for (index, tag) in self.suggestions.iter().enumerate() {
			let role = if index == self.selected { Role::Selection } else { Role::Dim };
			lines.push(Line::from(vec![
				Span::raw("  "),
				Span::styled(format!("#{tag}"), theme.style(role)),
			]));
		}

		Clear.render(popup, buf);
		Panel::new(self.title.clone(), lines)
			.border_style(theme.border(true))
			.render(popup, buf);

		Some(Position::new(cursor_x, popup.y + field_row))
	}
}

/// The partial tag being typed: the last word, if it starts with `#` and
/// nothing follows it.
fn tag_fragment(buffer: &str) -> Option<&str> {
	if buffer.ends_with(char::is_whitespace) {
		return None;
	}
	buffer
		.rsplit(char::is_whitespace)
		.next()
		.and_then(|word| word.strip_prefix('#'))
}

/// Case-insensitive substring match. An empty fragment lists the first tags.
fn matching_tags(tags: &[String], fragment: &str) -> Vec<String> {
	let needle = fragment.to_lowercase();
	tags.iter()
		.filter(|tag| tag.to_lowercase().contains(&needle))
		.take(SUGGESTION_LIMIT)
		.cloned()
		.collect()
}

/// Longest suffix of `text` that fits in `max_width` terminal columns.
fn tail(text: &str, max_width: usize) -> &str {
	let mut width = 0;
	let mut start = text.len();
	for (index, value) in text.char_indices().rev() {
		width += value.width().unwrap_or(0);
		if width > max_width {
			break;
		}
		start = index;
	}
	&text[start..]
}
