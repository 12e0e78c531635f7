use std::io;
use std::time::Duration as StdDuration;

use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::KeyBindings;

/// What woke the event loop up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
	/// The wait timed out; nothing happened except time passing.
	Tick,
	Resize,
	Key(KeyEvent),
}

/// Source of terminal input. `None` blocks until something arrives.
pub trait KeySource {
	fn next_input(&mut self, timeout: Option<StdDuration>) -> io::Result<Input>;
}

pub struct CrosstermInput;

impl KeySource for CrosstermInput {
	fn next_input(&mut self, timeout: Option<StdDuration>) -> io::Result<Input> {
		loop {
			if let Some(timeout) = timeout {
				if !event::poll(timeout)? {
					return Ok(Input::Tick);
				}
			}

			match event::read()? {
				CEvent::Key(key) if key.kind == KeyEventKind::Press => return Ok(Input::Key(key)),
				CEvent::Resize(_, _) => return Ok(Input::Resize),
				_ if timeout.is_some() => return Ok(Input::Tick),
				_ => {}
			}
		}
	}
}

/// Dashboard commands available while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	Quit,
	ScrollUp,
	ScrollDown,
	FocusNext,
	FocusPrev,
	Start,
	Stop,
	Reload,
	ToggleRange,
	Help,
}

/// Line-editing keys while a prompt is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
	Confirm,
	Cancel,
	Backspace,
	Insert(char),
	/// Move the tag suggestion highlight.
	SelectPrev,
	SelectNext,
	/// Accept the highlighted tag suggestion.
	Complete,
}

pub fn command_for(key: &KeyEvent, keys: &KeyBindings) -> Option<Command> {
	if key.modifiers.contains(KeyModifiers::CONTROL) {
		return match key.code {
			KeyCode::Char('c') => Some(Command::Quit),
			_ => None,
		};
	}

	// Configured characters win over the vi-style scroll fallbacks.
	match key.code {
		KeyCode::Esc => Some(Command::Quit),
		KeyCode::Up => Some(Command::ScrollUp),
		KeyCode::Down => Some(Command::ScrollDown),
		KeyCode::Tab => Some(Command::FocusNext),
		KeyCode::BackTab => Some(Command::FocusPrev),
		KeyCode::Char(value) if value == keys.quit => Some(Command::Quit),
		KeyCode::Char(value) if value == keys.start => Some(Command::Start),
		KeyCode::Char(value) if value == keys.stop => Some(Command::Stop),
		KeyCode::Char(value) if value == keys.reload => Some(Command::Reload),
		KeyCode::Char(value) if value == keys.toggle_range => Some(Command::ToggleRange),
		KeyCode::Char(value) if value == keys.help => Some(Command::Help),
		KeyCode::Char('k') => Some(Command::ScrollUp),
		KeyCode::Char('j') => Some(Command::ScrollDown),
		KeyCode::Char('?') => Some(Command::Help),
		_ => None,
	}
}

/// Keys that dismiss the help overlay.
pub fn closes_help(key: &KeyEvent, keys: &KeyBindings) -> bool {
	if key.modifiers.contains(KeyModifiers::CONTROL) {
		return key.code == KeyCode::Char('c');
	}
	match key.code {
		KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') => true,
		KeyCode::Char(value) => value == keys.help || value == keys.quit,
		_ => false,
	}
}

pub fn edit_for(key: &KeyEvent) -> Option<Edit> {
	if key.modifiers.contains(KeyModifiers::CONTROL) {
		return match key.code {
			KeyCode::Char('c') => Some(Edit::Cancel),
			_ => None,
		};
	}

	match key.code {
		KeyCode::Enter => Some(Edit::Confirm),
		KeyCode::Esc => Some(Edit::Cancel),
		KeyCode::Backspace | KeyCode::Delete => Some(Edit::Backspace),
		KeyCode::Up => Some(Edit::SelectPrev),
		KeyCode::Down => Some(Edit::SelectNext),
		KeyCode::Tab => Some(Edit::Complete),
		KeyCode::Char(value) => Some(Edit::Insert(value)),
		_ => None,
	}
}


#[cfg(test)]
mod tests {
	use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

	use super::{Command, Edit, closes_help, command_for, edit_for};
	use crate::config::KeyBindings;

	fn press(code: KeyCode) -> KeyEvent {
		KeyEvent::new(code, KeyModifiers::NONE)
	}

	#[test]
	fn maps_navigation_and_action_keys() {
		let keys = KeyBindings::default();
		assert_eq!(command_for(&press(KeyCode::Up), &keys), Some(Command::ScrollUp));
		assert_eq!(command_for(&press(KeyCode::Char('j')), &keys), Some(Command::ScrollDown));
		assert_eq!(command_for(&press(KeyCode::Tab), &keys), Some(Command::FocusNext));
		assert_eq!(command_for(&press(KeyCode::Char('n')), &keys), Some(Command::Start));
		assert_eq!(command_for(&press(KeyCode::Char('x')), &keys), Some(Command::Stop));
		assert_eq!(command_for(&press(KeyCode::Char('r')), &keys), Some(Command::Reload));
		assert_eq!(command_for(&press(KeyCode::Char('q')), &keys), Some(Command::Quit));
		assert_eq!(command_for(&press(KeyCode::Char('z')), &keys), None);
		let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
		assert_eq!(command_for(&ctrl_c, &keys), Some(Command::Quit));
	}

	#[test]
	fn custom_bindings_replace_defaults() {
		let keys = KeyBindings {
			start: 's',
			..KeyBindings::default()
		};
		assert_eq!(command_for(&press(KeyCode::Char('s')), &keys), Some(Command::Start));
		assert_eq!(command_for(&press(KeyCode::Char('n')), &keys), None);
	}

	#[test]
	fn bindings_take_precedence_over_scroll_letters() {
		let keys = KeyBindings {
			start: 'j',
			..KeyBindings::default()
		};
		assert_eq!(command_for(&press(KeyCode::Char('j')), &keys), Some(Command::Start));
		assert_eq!(command_for(&press(KeyCode::Down), &keys), Some(Command::ScrollDown));
		assert_eq!(command_for(&press(KeyCode::Char('k')), &keys), Some(Command::ScrollUp));
	}

	#[test]
	fn help_opens_from_binding_or_question_mark() {
		let keys = KeyBindings::default();
		assert_eq!(command_for(&press(KeyCode::Char('e')), &keys), Some(Command::Help));
		assert_eq!(command_for(&press(KeyCode::Char('?')), &keys), Some(Command::Help));
		assert!(closes_help(&press(KeyCode::Esc), &keys));
		assert!(closes_help(&press(KeyCode::Char('q')), &keys));
		assert!(closes_help(&press(KeyCode::Char('e')), &keys));
		assert!(!closes_help(&press(KeyCode::Char('n')), &keys));
	}

	#[test]
	fn prompt_keys_insert_characters_verbatim() {
		assert_eq!(edit_for(&press(KeyCode::Char('q'))), Some(Edit::Insert('q')));
		assert_eq!(edit_for(&press(KeyCode::Enter)), Some(Edit::Confirm));
		assert_eq!(edit_for(&press(KeyCode::Esc)), Some(Edit::Cancel));
		assert_eq!(edit_for(&press(KeyCode::Backspace)), Some(Edit::Backspace));
		assert_eq!(edit_for(&press(KeyCode::Up)), Some(Edit::SelectPrev));
		assert_eq!(edit_for(&press(KeyCode::Tab)), Some(Edit::Complete));
		assert_eq!(edit_for(&press(KeyCode::Left)), None);
	}
}
