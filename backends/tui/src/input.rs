//! Keyboard input understood by [`TuiApp`](crate::TuiApp).

use crossterm::event::{Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A key press, reduced to what the app reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A printable character.
    Char(char),
    /// Enter or Return.
    Enter,
    /// Move focus forward.
    Tab,
    /// Move focus backward.
    BackTab,
    /// Delete the last character of the focused input.
    Backspace,
    /// Leave the app.
    Escape,
}

impl Input {
    /// Converts a crossterm event. Releases, repeats of non-character keys and
    /// unsupported keys yield `None`.
    #[must_use]
    pub fn from_event(event: &TermEvent) -> Option<Self> {
        match event {
            TermEvent::Key(key) => Self::from_key(key),
            _ => None,
        }
    }

    fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Self::Escape);
        }
        match key.code {
            KeyCode::Char(c) => Some(Self::Char(c)),
            KeyCode::Enter => Some(Self::Enter),
            KeyCode::Tab => Some(Self::Tab),
            KeyCode::BackTab => Some(Self::BackTab),
            KeyCode::Backspace => Some(Self::Backspace),
            KeyCode::Esc => Some(Self::Escape),
            _ => None,
        }
    }
}
