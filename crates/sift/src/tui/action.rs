//! Actions for TUI state management.
//!
//! Key presses in the packet view resolve to an `Action` before they touch
//! the view or the control plane.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Actions that can be dispatched from the packet view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit the application
    Quit,

    // Navigation
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    /// Jump to the oldest record
    Top,
    /// Jump to the newest record and follow
    Bottom,

    // Session
    /// Pause or resume the capture; restarts it once it has ended
    TogglePause,
    /// Open the filter prompt
    EditFilter,
    /// Export the accumulated records
    Export,
    /// Discard accumulated records
    Clear,
}

impl Action {
    /// Map a key press in browse mode to an action
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Self::Quit),
                KeyCode::Char('u') => Some(Self::PageUp),
                KeyCode::Char('d') => Some(Self::PageDown),
                _ => None,
            };
        }

        let action = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Self::Quit,
            KeyCode::Up | KeyCode::Char('k') => Self::ScrollUp,
            KeyCode::Down | KeyCode::Char('j') => Self::ScrollDown,
            KeyCode::PageUp => Self::PageUp,
            KeyCode::PageDown => Self::PageDown,
            KeyCode::Home | KeyCode::Char('g') => Self::Top,
            KeyCode::End | KeyCode::Char('G') => Self::Bottom,
            KeyCode::Char('e') | KeyCode::Char(' ') => Self::TogglePause,
            KeyCode::Char('b') | KeyCode::Char('/') => Self::EditFilter,
            KeyCode::Char('d') => Self::Export,
            KeyCode::Char('c') => Self::Clear,
            _ => return None,
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_session_keys() {
        assert_eq!(
            Action::from_key(press(KeyCode::Char('e'))),
            Some(Action::TogglePause)
        );
        assert_eq!(
            Action::from_key(press(KeyCode::Char('b'))),
            Some(Action::EditFilter)
        );
        assert_eq!(
            Action::from_key(press(KeyCode::Char('d'))),
            Some(Action::Export)
        );
        assert_eq!(
            Action::from_key(press(KeyCode::Char('c'))),
            Some(Action::Clear)
        );
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(Action::from_key(press(KeyCode::Up)), Some(Action::ScrollUp));
        assert_eq!(
            Action::from_key(press(KeyCode::Char('j'))),
            Some(Action::ScrollDown)
        );
        assert_eq!(Action::from_key(press(KeyCode::PageUp)), Some(Action::PageUp));
        assert_eq!(Action::from_key(press(KeyCode::Char('g'))), Some(Action::Top));
        assert_eq!(
            Action::from_key(press(KeyCode::Char('G'))),
            Some(Action::Bottom)
        );
    }

    #[test]
    fn test_control_modifier() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Action::from_key(ctrl_c), Some(Action::Quit));

        // ctrl+d pages, plain d exports
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(Action::from_key(ctrl_d), Some(Action::PageDown));

        let ctrl_x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(Action::from_key(ctrl_x), None);
    }

    #[test]
    fn test_unbound_key() {
        assert_eq!(Action::from_key(press(KeyCode::Char('z'))), None);
        assert_eq!(Action::from_key(press(KeyCode::Tab)), None);
    }
}
