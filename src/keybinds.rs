use std::fmt;

use crate::error::{Error, Result};

/// Logical key identifier supported by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Always stored lowercase; `Shift` is tracked separately
    Character(char),
    Escape,
    Enter,
    Tab,
}

impl Key {
    fn parse(value: &str) -> std::result::Result<Self, String> {
        let normalized = value.trim();
        match normalized.to_ascii_uppercase().as_str() {
            "ESC" | "ESCAPE" => Ok(Self::Escape),
            "ENTER" | "RETURN" => Ok(Self::Enter),
            "TAB" => Ok(Self::Tab),
            _ => {
                let mut chars = normalized.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Self::character(ch)),
                    _ => Err(format!("unknown key '{}'", normalized)),
                }
            }
        }
    }

    pub fn character(ch: char) -> Self {
        Self::Character(ch.to_ascii_lowercase())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Character(ch) => write!(f, "{}", ch.to_ascii_uppercase()),
            Key::Escape => write!(f, "Esc"),
            Key::Enter => write!(f, "Enter"),
            Key::Tab => write!(f, "Tab"),
        }
    }
}

/// A key press as reported by the host, with modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Cmd on macOS, the Windows key elsewhere
    pub meta: bool,
    pub key: Key,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
            key,
        }
    }

    pub fn ctrl(key: char) -> Self {
        Self {
            ctrl: true,
            ..Self::new(Key::character(key))
        }
    }

    pub fn meta(key: char) -> Self {
        Self {
            meta: true,
            ..Self::new(Key::character(key))
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// Combination describing a shortcut that can be bound to an action.
///
/// The primary modifier matches either Ctrl or Cmd, so one binding serves
/// every platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombination {
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
    /// Shift and Alt are not compared when set
    pub lenient: bool,
    pub key: Key,
}

impl KeyCombination {
    pub fn matches(&self, event: &KeyEvent) -> bool {
        let modifiers_match =
            self.lenient || (self.shift == event.shift && self.alt == event.alt);
        self.primary == (event.ctrl || event.meta) && modifiers_match && self.key == event.key
    }

    /// Same combination, but also matching with Shift or Alt held
    pub fn lenient(self) -> Self {
        Self {
            lenient: true,
            ..self
        }
    }

    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidKeyBinding {
            binding: spec.to_string(),
            reason,
        };

        let mut primary = false;
        let mut shift = false;
        let mut alt = false;
        let mut key: Option<Key> = None;

        for part in spec.split('+') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }

            match trimmed.to_ascii_lowercase().as_str() {
                "ctrl" | "control" | "cmd" | "command" | "meta" | "super" | "mod" => primary = true,
                "shift" => shift = true,
                "alt" | "option" => alt = true,
                _ => {
                    if key.is_some() {
                        return Err(invalid("more than one key".to_string()));
                    }
                    key = Some(Key::parse(trimmed).map_err(invalid)?);
                }
            }
        }

        let key = key.ok_or_else(|| invalid("no key specified".to_string()))?;

        Ok(Self {
            primary,
            shift,
            alt,
            lenient: false,
            key,
        })
    }

    fn primary(key: char) -> Self {
        Self {
            primary: true,
            shift: false,
            alt: false,
            lenient: false,
            key: Key::character(key),
        }
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primary {
            write!(f, "Ctrl+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        if self.alt {
            write!(f, "Alt+")?;
        }
        write!(f, "{}", self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    ToggleSearch,
    CloseSearch,
    Undo,
    Redo,
}

/// Result of offering a key press to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyOutcome {
    pub action: Option<EditorAction>,
    /// The host must suppress its own handling (e.g. native find)
    pub prevent_default: bool,
}

impl KeyOutcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn handled(action: EditorAction) -> Self {
        Self {
            action: Some(action),
            prevent_default: true,
        }
    }
}

/// Keymap describing the mapping between shortcuts and editor actions.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<(KeyCombination, EditorAction)>,
}

impl Default for Keymap {
    fn default() -> Self {
        let bindings = vec![
            (
                KeyCombination::primary('f').lenient(),
                EditorAction::ToggleSearch,
            ),
            (
                KeyCombination::primary('h').lenient(),
                EditorAction::ToggleSearch,
            ),
            (KeyCombination::primary('z'), EditorAction::Undo),
            (
                KeyCombination {
                    shift: true,
                    ..KeyCombination::primary('z')
                },
                EditorAction::Redo,
            ),
            (KeyCombination::primary('y'), EditorAction::Redo),
            (
                KeyCombination {
                    primary: false,
                    shift: false,
                    alt: false,
                    lenient: false,
                    key: Key::Escape,
                },
                EditorAction::CloseSearch,
            ),
        ];
        Self { bindings }
    }
}

impl Keymap {
    /// Replace the bindings of one action with parsed `specs`.
    /// Search hotkeys without Shift or Alt ignore those modifiers, like the defaults.
    pub fn rebind(&mut self, action: EditorAction, specs: &[String]) -> Result<()> {
        let parsed = specs
            .iter()
            .map(|spec| -> Result<KeyCombination> {
                let combination = KeyCombination::parse(spec)?;
                let plain = !combination.shift && !combination.alt;
                Ok(if action == EditorAction::ToggleSearch && plain {
                    combination.lenient()
                } else {
                    combination
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.bindings.retain(|(_, bound)| *bound != action);
        self.bindings
            .extend(parsed.into_iter().map(|combination| (combination, action)));
        Ok(())
    }

    pub fn resolve(&self, event: &KeyEvent) -> Option<EditorAction> {
        self.bindings
            .iter()
            .find(|(combination, _)| combination.matches(event))
            .map(|(_, action)| *action)
    }

    pub fn bindings_for(&self, action: EditorAction) -> Vec<&KeyCombination> {
        self.bindings
            .iter()
            .filter(|(_, bound)| *bound == action)
            .map(|(combination, _)| combination)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_search_hotkeys() {
        let keymap = Keymap::default();
        for event in [
            KeyEvent::ctrl('f'),
            KeyEvent::ctrl('h'),
            KeyEvent::meta('f'),
            KeyEvent::meta('H'),
        ] {
            assert_eq!(keymap.resolve(&event), Some(EditorAction::ToggleSearch));
        }
        assert_eq!(keymap.resolve(&KeyEvent::new(Key::character('f'))), None);
    }

    #[test]
    fn test_search_hotkeys_ignore_shift_and_alt() {
        let keymap = Keymap::default();
        let mut alt_h = KeyEvent::meta('h');
        alt_h.alt = true;
        for event in [KeyEvent::ctrl('f').with_shift(), KeyEvent::meta('H').with_shift(), alt_h] {
            assert_eq!(keymap.resolve(&event), Some(EditorAction::ToggleSearch));
        }
        // Undo stays exact so Shift still selects Redo
        let mut alt_z = KeyEvent::ctrl('z');
        alt_z.alt = true;
        assert_eq!(keymap.resolve(&alt_z), None);
    }

    #[test]
    fn test_redo_requires_shift() {
        let keymap = Keymap::default();
        assert_eq!(keymap.resolve(&KeyEvent::ctrl('z')), Some(EditorAction::Undo));
        assert_eq!(
            keymap.resolve(&KeyEvent::ctrl('z').with_shift()),
            Some(EditorAction::Redo)
        );
    }

    #[test]
    fn test_parse_combination() {
        let combo = KeyCombination::parse("Cmd+Shift+K").unwrap();
        assert!(combo.primary);
        assert!(combo.shift);
        assert_eq!(combo.key, Key::Character('k'));
        assert_eq!(combo.to_string(), "Ctrl+Shift+K");

        assert_eq!(
            KeyCombination::parse("esc").unwrap().key,
            Key::Escape
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(KeyCombination::parse("Ctrl+").is_err());
        assert!(KeyCombination::parse("Ctrl+A+B").is_err());
        assert!(KeyCombination::parse("Ctrl+PageDown").is_err());
    }

    #[test]
    fn test_rebind_replaces_action_bindings() {
        let mut keymap = Keymap::default();
        keymap
            .rebind(EditorAction::ToggleSearch, &["Ctrl+K".to_string()])
            .unwrap();

        assert_eq!(keymap.resolve(&KeyEvent::ctrl('f')), None);
        assert_eq!(
            keymap.resolve(&KeyEvent::ctrl('k')),
            Some(EditorAction::ToggleSearch)
        );
        assert_eq!(keymap.bindings_for(EditorAction::ToggleSearch).len(), 1);
        assert_eq!(
            keymap.resolve(&KeyEvent::ctrl('k').with_shift()),
            Some(EditorAction::ToggleSearch)
        );

        keymap
            .rebind(EditorAction::ToggleSearch, &["Ctrl+Shift+K".to_string()])
            .unwrap();
        assert_eq!(keymap.resolve(&KeyEvent::ctrl('k')), None);
    }
}
