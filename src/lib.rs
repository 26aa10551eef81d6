//! keychord - context-aware keybinding resolution
//!
//! This crate resolves key presses to commands against a layered keymap:
//! default rules, user overrides that may remove defaults, `when` guards
//! evaluated against a context, and two-key chords with timeouts.

pub mod cli;
pub mod config_paths;
pub mod keymap;
pub mod tracing;

// Re-export commonly used types
pub use keymap::{
    CurrentChord, KeyContext, KeybindingResolver, Keymap, Keystroke, ResolveResult,
    ResolvedKeybinding, WhenExpr,
};
