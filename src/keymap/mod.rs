//! Context-aware keybinding resolution
//!
//! This module turns key presses into commands:
//! - Rules from a default keymap and user overrides are merged by priority
//!   (later wins); `-command` overrides remove defaults
//! - Each rule may carry a `when` guard evaluated against a [`KeyContext`]
//! - Two-key chords (`ctrl+k ctrl+c`) with a per-rule timeout
//! - Reverse lookup from a command to the key presses that reach it
//!
//! # Architecture
//!
//! ```text
//! defaults + overrides → combine() → KeybindingIndex
//!                                          ↓
//!            Keystroke + KeyContext → resolve() → ResolveResult
//! ```
//!
//! # Loading Keymaps
//!
//! ```ignore
//! let layers = KeymapLayers::load(&override_paths());
//! let mut keymap = Keymap::new(Arc::new(layers.into_resolver()));
//!
//! let ctx = KeyContext::new().with("editorTextFocus", true);
//! match keymap.handle_keystroke(&ctx, &"ctrl+k".parse()?) {
//!     ResolveResult::EnterChord { .. } => { /* show hint, wait */ }
//!     other => run(other.command()),
//! }
//! ```

mod binding;
mod config;
mod context;
mod defaults;
mod implication;
mod index;
#[allow(clippy::module_inception)]
mod keymap;
mod merge;
mod resolver;
mod types;
mod watch;
mod when;

pub use binding::{BindingSource, ResolvedKeybinding, DEFAULT_CHORD_TIMEOUT_MS};
pub use config::{load_keymap_file, parse_keymap_yaml, BindingConfig, KeymapConfig, KeymapError};
pub use context::{ContextValue, KeyContext, WhenClause};
pub use defaults::{
    load_default_keymap, override_paths, read_overrides, KeymapLayers, DEFAULT_KEYMAP_YAML,
};
pub use implication::when_is_entirely_included;
pub use index::KeybindingIndex;
pub use keymap::Keymap;
pub use merge::combine;
pub use resolver::{CurrentChord, KeybindingResolver, LogSink, ResolveResult};
pub use types::{DispatchParts, KeyCode, KeySequence, Keystroke, Modifiers};
pub use watch::KeymapWatcher;
pub use when::{parse_when, WhenExpr};
