//! Keyboard shortcuts and their help-text spellings

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Submit the current form
pub const SUBMIT_SHORTCUT: &str = "Ctrl+S";

/// Upload the chosen PDF for a preview
pub const PREVIEW_SHORTCUT: &str = "Ctrl+P";

/// Send the edited panels for recalculation
pub const RECALC_SHORTCUT: &str = "Ctrl+R";

/// Hide the debug panel
pub const HIDE_DEBUG_SHORTCUT: &str = "Ctrl+D";

/// True for Ctrl+`c` (case-insensitive)
pub fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char(k) if k.eq_ignore_ascii_case(&c))
}

/// View index selected by a function key: F1 is the first view
pub fn view_index(key: &KeyEvent) -> Option<usize> {
    match key.code {
        KeyCode::F(n) if n >= 1 => Some(usize::from(n - 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_ctrl_matches() {
        assert!(is_ctrl(&key(KeyCode::Char('s'), KeyModifiers::CONTROL), 's'));
        assert!(is_ctrl(&key(KeyCode::Char('S'), KeyModifiers::CONTROL), 's'));
    }

    #[test]
    fn test_plain_char_is_not_ctrl() {
        assert!(!is_ctrl(&key(KeyCode::Char('s'), KeyModifiers::NONE), 's'));
    }

    #[test]
    fn test_wrong_char_returns_false() {
        assert!(!is_ctrl(&key(KeyCode::Char('r'), KeyModifiers::CONTROL), 's'));
    }

    #[test]
    fn test_function_keys_select_views() {
        assert_eq!(view_index(&key(KeyCode::F(1), KeyModifiers::NONE)), Some(0));
        assert_eq!(view_index(&key(KeyCode::F(3), KeyModifiers::NONE)), Some(2));
        assert_eq!(view_index(&key(KeyCode::F(0), KeyModifiers::NONE)), None);
        assert_eq!(view_index(&key(KeyCode::Enter, KeyModifiers::NONE)), None);
    }
}
