//! A resolved keybinding: the normalized rule the resolver indexes

use serde_json::Value;

use super::context::WhenClause;
use super::types::{DispatchParts, Keystroke};
use super::when::WhenExpr;

/// Chord timeout used when a rule does not specify one (or specifies 0)
pub const DEFAULT_CHORD_TIMEOUT_MS: u64 = 5000;

/// Command prefix marking a rule that should not consume the key event
pub const BUBBLE_PREFIX: char = '^';

/// Command prefix marking an override entry that removes default rules
pub const REMOVAL_PREFIX: char = '-';

/// Where a rule came from. Only used for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSource {
    pub is_default: bool,
    pub extension_id: Option<String>,
    pub is_builtin_extension: bool,
}

impl BindingSource {
    /// Rule shipped with the host
    pub fn builtin() -> Self {
        Self {
            is_default: true,
            ..Self::default()
        }
    }

    /// Rule from the user's keymap
    pub fn user() -> Self {
        Self::default()
    }

    /// Rule contributed by an extension, loaded as part of a default or user layer
    pub fn extension(id: impl Into<String>, is_builtin: bool, is_default: bool) -> Self {
        Self {
            is_default,
            extension_id: Some(id.into()),
            is_builtin_extension: is_builtin,
        }
    }

    /// e.g. "built-in", "user", "user extension acme.vim"
    pub fn describe(&self) -> String {
        match (&self.extension_id, self.is_builtin_extension, self.is_default) {
            (Some(id), true, _) => format!("built-in extension {}", id),
            (Some(id), false, _) => format!("user extension {}", id),
            (None, _, true) => "built-in".to_string(),
            (None, _, false) => "user".to_string(),
        }
    }
}

/// An immutable keybinding rule
///
/// Rules are shared behind `Arc` once they enter a resolver. Identity matters
/// there: two structurally equal rules are still distinct entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedKeybinding<E = WhenExpr> {
    /// Dispatchable key presses: empty (unbound), one, or two for a chord
    pub keypress_parts: Vec<Keystroke>,
    /// Do not consume the event if a nested handler also matches
    pub bubble: bool,
    /// `None` is an explicit unbinding
    pub command: Option<String>,
    /// Passed through to the command untouched
    pub command_args: Value,
    /// `None` always matches
    pub when: Option<E>,
    /// Milliseconds allowed between the two halves of a chord
    pub timeout: u64,
    pub source: BindingSource,
}

impl<E: WhenClause> ResolvedKeybinding<E> {
    /// Build a rule from low-level dispatch parts and a raw command string
    ///
    /// Dispatch parts are cut at the first `None`: a chord position without a
    /// dispatch string makes everything after it unusable. A command starting
    /// with `^` sets `bubble` and loses the marker.
    pub fn new<D: DispatchParts + ?Sized>(
        dispatch: Option<&D>,
        command: Option<&str>,
        command_args: Value,
        when: Option<E>,
        timeout: Option<u64>,
        source: BindingSource,
    ) -> Self {
        let keypress_parts: Vec<Keystroke> = dispatch
            .map(|d| d.dispatch_parts().into_iter().map_while(|p| p).collect())
            .unwrap_or_default();
        debug_assert!(keypress_parts.len() <= 2, "at most one chord part");

        let (command, bubble) = match command {
            Some(cmd) => match cmd.strip_prefix(BUBBLE_PREFIX) {
                Some(rest) => (Some(rest.to_string()), true),
                None => (Some(cmd.to_string()), false),
            },
            None => (None, false),
        };

        Self {
            keypress_parts,
            bubble,
            command,
            command_args,
            when,
            timeout: match timeout {
                Some(ms) if ms > 0 => ms,
                _ => DEFAULT_CHORD_TIMEOUT_MS,
            },
            source,
        }
    }

    /// Shorthand for a user rule binding `parts` to `command`
    pub fn bind(parts: &[Keystroke], command: &str) -> Self {
        Self::new(
            Some(parts),
            Some(command),
            Value::Null,
            None,
            None,
            BindingSource::user(),
        )
    }

    /// A rule that claims `parts` without running anything
    pub fn unbind_keys(parts: &[Keystroke]) -> Self {
        Self::new(
            Some(parts),
            None,
            Value::Null,
            None,
            None,
            BindingSource::user(),
        )
    }

    /// A rule with a command but no keys
    pub fn unbound(command: &str) -> Self {
        Self::new(
            None::<&[Keystroke]>,
            Some(command),
            Value::Null,
            None,
            None,
            BindingSource::user(),
        )
    }

    pub fn with_when(mut self, when: E) -> Self {
        self.when = Some(when);
        self
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.command_args = args;
        self
    }

    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = if ms > 0 { ms } else { DEFAULT_CHORD_TIMEOUT_MS };
        self
    }

    pub fn with_source(mut self, source: BindingSource) -> Self {
        self.source = source;
        self
    }
}

impl<E> ResolvedKeybinding<E> {
    pub fn first_part(&self) -> Option<&Keystroke> {
        self.keypress_parts.first()
    }

    pub fn chord_part(&self) -> Option<&Keystroke> {
        self.keypress_parts.get(1)
    }

    pub fn is_chord(&self) -> bool {
        self.keypress_parts.len() > 1
    }

    pub fn is_unbound(&self) -> bool {
        self.keypress_parts.is_empty()
    }

    /// The command this override entry removes, if it is a removal entry
    pub fn removal_target(&self) -> Option<&str> {
        self.command
            .as_deref()
            .and_then(|cmd| cmd.strip_prefix(REMOVAL_PREFIX))
    }

    /// Get display string for this keybinding
    pub fn display_string(&self) -> String {
        self.keypress_parts
            .iter()
            .map(|k| k.display_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Dispatch strings joined by a space, e.g. "ctrl+k ctrl+c"
    pub fn key_string(&self) -> String {
        self.keypress_parts
            .iter()
            .map(|k| k.dispatch_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::types::{KeyCode, Modifiers};

    fn ctrl(c: char) -> Keystroke {
        Keystroke::new(KeyCode::Char(c), Modifiers::CTRL)
    }

    #[test]
    fn test_single_binding() {
        let binding: ResolvedKeybinding = ResolvedKeybinding::bind(&[ctrl('s')], "file.save");

        assert!(!binding.is_chord());
        assert_eq!(binding.first_part(), Some(&ctrl('s')));
        assert_eq!(binding.chord_part(), None);
        assert_eq!(binding.command.as_deref(), Some("file.save"));
        assert_eq!(binding.timeout, DEFAULT_CHORD_TIMEOUT_MS);
    }

    #[test]
    fn test_chord_binding() {
        let binding: ResolvedKeybinding =
            ResolvedKeybinding::bind(&[ctrl('k'), ctrl('c')], "editor.comment");

        assert!(binding.is_chord());
        assert_eq!(binding.chord_part(), Some(&ctrl('c')));
        assert_eq!(binding.key_string(), "ctrl+k ctrl+c");
    }

    #[test]
    fn test_dispatch_parts_truncate_at_first_gap() {
        let parts = [Some(ctrl('k')), None];
        let binding: ResolvedKeybinding = ResolvedKeybinding::new(
            Some(&parts[..]),
            Some("x"),
            Value::Null,
            None,
            None,
            BindingSource::user(),
        );
        assert_eq!(binding.keypress_parts, vec![ctrl('k')]);

        let parts = [None, Some(ctrl('c'))];
        let binding: ResolvedKeybinding = ResolvedKeybinding::new(
            Some(&parts[..]),
            Some("x"),
            Value::Null,
            None,
            None,
            BindingSource::user(),
        );
        assert!(binding.is_unbound());
    }

    #[test]
    fn test_bubble_marker_is_stripped() {
        let binding: ResolvedKeybinding = ResolvedKeybinding::bind(&[ctrl('a')], "^editor.selectAll");
        assert!(binding.bubble);
        assert_eq!(binding.command.as_deref(), Some("editor.selectAll"));
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let binding: ResolvedKeybinding = ResolvedKeybinding::new(
            Some(&[ctrl('k'), ctrl('c')]),
            Some("x"),
            Value::Null,
            None,
            Some(0),
            BindingSource::user(),
        );
        assert_eq!(binding.timeout, DEFAULT_CHORD_TIMEOUT_MS);
        assert_eq!(binding.with_timeout(750).timeout, 750);
    }

    #[test]
    fn test_removal_target() {
        let removal: ResolvedKeybinding = ResolvedKeybinding::unbound("-file.save");
        assert_eq!(removal.removal_target(), Some("file.save"));

        let plain: ResolvedKeybinding = ResolvedKeybinding::unbound("file.save");
        assert_eq!(plain.removal_target(), None);

        let unbinding: ResolvedKeybinding = ResolvedKeybinding::unbind_keys(&[ctrl('s')]);
        assert_eq!(unbinding.removal_target(), None);
        assert_eq!(unbinding.command, None);
    }

    #[test]
    fn test_source_description() {
        assert_eq!(BindingSource::builtin().describe(), "built-in");
        assert_eq!(BindingSource::user().describe(), "user");
        assert_eq!(
            BindingSource::extension("vscode.git", true, true).describe(),
            "built-in extension vscode.git"
        );
        assert_eq!(
            BindingSource::extension("acme.vim", false, false).describe(),
            "user extension acme.vim"
        );
    }
}
