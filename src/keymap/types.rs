//! Core key types: Keystroke, Modifiers, KeyCode, KeySequence
//!
//! A [`Keystroke`] is the normalized key-press identifier the resolver indexes
//! on. Its canonical dispatch string (`ctrl+shift+k`) is what the diagnostics
//! print and what keymap files spell.

use std::fmt;
use std::str::FromStr;

use super::config::KeymapError;

/// Modifier keys as a bitfield for efficient storage and comparison
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CTRL: Modifiers = Modifiers(0b0001);
    pub const SHIFT: Modifiers = Modifiers(0b0010);
    pub const ALT: Modifiers = Modifiers(0b0100);
    pub const META: Modifiers = Modifiers(0b1000); // Cmd on macOS, Win on Windows

    /// Create modifiers from individual flags
    pub const fn new(ctrl: bool, shift: bool, alt: bool, meta: bool) -> Self {
        let mut bits = 0u8;
        if ctrl {
            bits |= 0b0001;
        }
        if shift {
            bits |= 0b0010;
        }
        if alt {
            bits |= 0b0100;
        }
        if meta {
            bits |= 0b1000;
        }
        Modifiers(bits)
    }

    #[inline]
    pub const fn ctrl(self) -> bool {
        self.0 & 0b0001 != 0
    }

    #[inline]
    pub const fn shift(self) -> bool {
        self.0 & 0b0010 != 0
    }

    #[inline]
    pub const fn alt(self) -> bool {
        self.0 & 0b0100 != 0
    }

    #[inline]
    pub const fn meta(self) -> bool {
        self.0 & 0b1000 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Combine two modifier sets
    #[inline]
    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    /// Get the platform-specific "command" modifier (Cmd on macOS, Ctrl elsewhere)
    pub fn cmd() -> Modifiers {
        if cfg!(target_os = "macos") {
            Modifiers::META
        } else {
            Modifiers::CTRL
        }
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// A key code representing a physical or logical key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    /// A character key (normalized to lowercase)
    Char(char),

    // Named keys
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Space,

    // Arrow keys
    Up,
    Down,
    Left,
    Right,

    // Navigation
    Home,
    End,
    PageUp,
    PageDown,
    Insert,

    // Function keys
    F(u8), // F1-F24

    // Numpad (physical keys)
    Numpad(u8),
    NumpadAdd,
    NumpadSubtract,
    NumpadMultiply,
    NumpadDivide,
    NumpadEnter,
    NumpadDecimal,
}

impl KeyCode {
    /// Parse a single key name (no modifiers)
    pub fn parse(key: &str) -> Result<KeyCode, KeymapError> {
        let lower = key.to_lowercase();

        let mut chars = lower.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(KeyCode::Char(c));
        }

        if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            if (1..=24).contains(&n) {
                return Ok(KeyCode::F(n));
            }
        }

        if let Some(n) = lower
            .strip_prefix("numpad")
            .or_else(|| lower.strip_prefix("num"))
            .and_then(|n| n.parse::<u8>().ok())
        {
            if n <= 9 {
                return Ok(KeyCode::Numpad(n));
            }
        }

        match lower.as_str() {
            "enter" | "return" => Ok(KeyCode::Enter),
            "escape" | "esc" => Ok(KeyCode::Escape),
            "tab" => Ok(KeyCode::Tab),
            "backspace" | "back" => Ok(KeyCode::Backspace),
            "delete" | "del" => Ok(KeyCode::Delete),
            "space" => Ok(KeyCode::Space),

            "up" | "arrowup" => Ok(KeyCode::Up),
            "down" | "arrowdown" => Ok(KeyCode::Down),
            "left" | "arrowleft" => Ok(KeyCode::Left),
            "right" | "arrowright" => Ok(KeyCode::Right),

            "home" => Ok(KeyCode::Home),
            "end" => Ok(KeyCode::End),
            "pageup" | "pgup" => Ok(KeyCode::PageUp),
            "pagedown" | "pgdown" | "pgdn" => Ok(KeyCode::PageDown),
            "insert" | "ins" => Ok(KeyCode::Insert),

            "numpad_add" | "numadd" | "numplus" => Ok(KeyCode::NumpadAdd),
            "numpad_subtract" | "numsub" | "numminus" => Ok(KeyCode::NumpadSubtract),
            "numpad_multiply" | "nummul" => Ok(KeyCode::NumpadMultiply),
            "numpad_divide" | "numdiv" => Ok(KeyCode::NumpadDivide),
            "numpad_enter" | "numenter" => Ok(KeyCode::NumpadEnter),
            "numpad_decimal" | "numdot" => Ok(KeyCode::NumpadDecimal),

            _ => Err(KeymapError::InvalidKey(format!("Unknown key: {}", key))),
        }
    }
}

impl fmt::Display for KeyCode {
    /// Canonical lowercase name, the inverse of [`KeyCode::parse`]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Char(c) => write!(f, "{}", c),
            KeyCode::Enter => write!(f, "enter"),
            KeyCode::Escape => write!(f, "escape"),
            KeyCode::Tab => write!(f, "tab"),
            KeyCode::Backspace => write!(f, "backspace"),
            KeyCode::Delete => write!(f, "delete"),
            KeyCode::Space => write!(f, "space"),
            KeyCode::Up => write!(f, "up"),
            KeyCode::Down => write!(f, "down"),
            KeyCode::Left => write!(f, "left"),
            KeyCode::Right => write!(f, "right"),
            KeyCode::Home => write!(f, "home"),
            KeyCode::End => write!(f, "end"),
            KeyCode::PageUp => write!(f, "pageup"),
            KeyCode::PageDown => write!(f, "pagedown"),
            KeyCode::Insert => write!(f, "insert"),
            KeyCode::F(n) => write!(f, "f{}", n),
            KeyCode::Numpad(n) => write!(f, "numpad{}", n),
            KeyCode::NumpadAdd => write!(f, "numpad_add"),
            KeyCode::NumpadSubtract => write!(f, "numpad_subtract"),
            KeyCode::NumpadMultiply => write!(f, "numpad_multiply"),
            KeyCode::NumpadDivide => write!(f, "numpad_divide"),
            KeyCode::NumpadEnter => write!(f, "numpad_enter"),
            KeyCode::NumpadDecimal => write!(f, "numpad_decimal"),
        }
    }
}

/// A single keystroke: a key with modifiers
///
/// This is the dispatch identifier of one key press. Two keystrokes are the
/// same key press exactly when they compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keystroke {
    pub key: KeyCode,
    pub mods: Modifiers,
}

impl Keystroke {
    pub const fn new(key: KeyCode, mods: Modifiers) -> Self {
        Self { key, mods }
    }

    /// Create a keystroke with no modifiers
    pub const fn key(key: KeyCode) -> Self {
        Self {
            key,
            mods: Modifiers::NONE,
        }
    }

    /// Create a keystroke with a character and modifiers
    pub fn char_with_mods(c: char, mods: Modifiers) -> Self {
        Self {
            key: KeyCode::Char(c.to_ascii_lowercase()),
            mods,
        }
    }

    /// Canonical dispatch string, e.g. `ctrl+shift+k`
    pub fn dispatch_string(&self) -> String {
        self.to_string()
    }

    /// Display the keystroke using platform-specific symbols
    pub fn display_string(&self) -> String {
        let mut parts = Vec::new();

        if cfg!(target_os = "macos") {
            // macOS uses symbols: ⌃ ⇧ ⌥ ⌘
            if self.mods.ctrl() {
                parts.push("⌃");
            }
            if self.mods.alt() {
                parts.push("⌥");
            }
            if self.mods.shift() {
                parts.push("⇧");
            }
            if self.mods.meta() {
                parts.push("⌘");
            }
        } else {
            if self.mods.ctrl() {
                parts.push("Ctrl+");
            }
            if self.mods.alt() {
                parts.push("Alt+");
            }
            if self.mods.shift() {
                parts.push("Shift+");
            }
            if self.mods.meta() {
                parts.push("Win+");
            }
        }

        let key_str = match self.key {
            KeyCode::Char(c) => c.to_uppercase().to_string(),
            KeyCode::Up => "↑".to_string(),
            KeyCode::Down => "↓".to_string(),
            KeyCode::Left => "←".to_string(),
            KeyCode::Right => "→".to_string(),
            KeyCode::F(n) => format!("F{}", n),
            other => {
                let name = other.to_string();
                let mut chars = name.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => name,
                }
            }
        };

        format!("{}{}", parts.join(""), key_str)
    }
}

impl fmt::Display for Keystroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.ctrl() {
            write!(f, "ctrl+")?;
        }
        if self.mods.shift() {
            write!(f, "shift+")?;
        }
        if self.mods.alt() {
            write!(f, "alt+")?;
        }
        if self.mods.meta() {
            write!(f, "meta+")?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for Keystroke {
    type Err = KeymapError;

    /// Parse a key string like "cmd+shift+s" into a Keystroke
    fn from_str(key_str: &str) -> Result<Self, Self::Err> {
        let trimmed = key_str.trim();
        if trimmed.is_empty() {
            return Err(KeymapError::InvalidKey(key_str.to_string()));
        }

        // A trailing '+' is the plus key itself ("ctrl++")
        let (mod_part, plus_key) = match trimmed.strip_suffix("++") {
            Some(rest) => (rest, true),
            None if trimmed == "+" => ("", true),
            None => (trimmed, false),
        };

        let mut mods = Modifiers::NONE;
        let mut key_part = if plus_key {
            Some(KeyCode::Char('+'))
        } else {
            None
        };

        for part in mod_part.split('+') {
            if part.is_empty() {
                if mod_part.is_empty() {
                    continue;
                }
                return Err(KeymapError::InvalidKey(format!(
                    "Empty segment in binding: {}",
                    key_str
                )));
            }
            match part.to_lowercase().as_str() {
                "cmd" => mods = mods | Modifiers::cmd(),
                "ctrl" | "control" => mods = mods | Modifiers::CTRL,
                "shift" => mods = mods | Modifiers::SHIFT,
                "alt" | "option" | "opt" => mods = mods | Modifiers::ALT,
                "meta" | "super" | "win" => mods = mods | Modifiers::META,
                _ => {
                    if key_part.is_some() {
                        return Err(KeymapError::InvalidKey(format!(
                            "Multiple keys in binding: {}",
                            key_str
                        )));
                    }
                    key_part = Some(KeyCode::parse(part)?);
                }
            }
        }

        let key = key_part.ok_or_else(|| {
            KeymapError::InvalidKey(format!("No key found in binding: {}", key_str))
        })?;

        Ok(Keystroke::new(key, mods))
    }
}

/// Low-level key dispatch capability
///
/// Yields the chord positions of a physical key sequence. A `None` entry means
/// that position has no canonical dispatch string on the current layout.
pub trait DispatchParts {
    fn dispatch_parts(&self) -> Vec<Option<Keystroke>>;
}

impl DispatchParts for [Option<Keystroke>] {
    fn dispatch_parts(&self) -> Vec<Option<Keystroke>> {
        self.to_vec()
    }
}

impl DispatchParts for [Keystroke] {
    fn dispatch_parts(&self) -> Vec<Option<Keystroke>> {
        self.iter().copied().map(Some).collect()
    }
}

impl<const N: usize> DispatchParts for [Keystroke; N] {
    fn dispatch_parts(&self) -> Vec<Option<Keystroke>> {
        self.as_slice().dispatch_parts()
    }
}

/// A key sequence as written in a keymap file: one keystroke, or two for a chord
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeySequence(Vec<Keystroke>);

impl KeySequence {
    pub fn new(parts: Vec<Keystroke>) -> Self {
        debug_assert!(parts.len() <= 2, "key sequences hold at most a chord");
        Self(parts)
    }

    pub fn parts(&self) -> &[Keystroke] {
        &self.0
    }

    pub fn is_chord(&self) -> bool {
        self.0.len() > 1
    }
}

impl DispatchParts for KeySequence {
    fn dispatch_parts(&self) -> Vec<Option<Keystroke>> {
        self.0.dispatch_parts()
    }
}

impl FromStr for KeySequence {
    type Err = KeymapError;

    /// Parse "ctrl+k ctrl+c" (space separated) into a sequence
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(Keystroke::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        match parts.len() {
            1 | 2 => Ok(KeySequence(parts)),
            0 => Err(KeymapError::InvalidKey(format!("Empty key sequence: {:?}", s))),
            n => Err(KeymapError::InvalidKey(format!(
                "Key sequences support at most 2 keystrokes, got {}: {}",
                n, s
            ))),
        }
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|k| k.dispatch_string())
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{}", joined)
    }
}
