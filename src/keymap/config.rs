//! YAML configuration parsing for keymaps
//!
//! Parses keymap.yaml files into resolved keybindings.
//!
//! ```yaml
//! bindings:
//!   - key: "ctrl+k ctrl+c"
//!     command: editor.action.addCommentLine
//!     when: "editorTextFocus && !editorReadonly"
//!   - command: "-editor.action.formatDocument"   # remove a default
//!   - key: "ctrl+a"
//!     command: "^editor.action.selectAll"        # do not consume the event
//!     args: { wrap: true }
//!     timeout: 1500
//!     platform: macos
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::binding::{BindingSource, ResolvedKeybinding, BUBBLE_PREFIX, REMOVAL_PREFIX};
use super::types::KeySequence;
use super::when::{parse_when, WhenExpr};

/// Root structure of a keymap YAML file
#[derive(Debug, Deserialize)]
pub struct KeymapConfig {
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

/// A single binding entry from YAML
#[derive(Debug, Deserialize)]
pub struct BindingConfig {
    /// One keystroke, or two separated by a space. Omitted on removals that
    /// match any keys.
    #[serde(default)]
    pub key: Option<String>,
    /// `null` claims the key without running anything
    pub command: Option<String>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub builtin: bool,
}

/// Errors that can occur when loading keymaps
#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Invalid when clause: {0}")]
    InvalidWhen(String),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Load keybindings from a YAML file
pub fn load_keymap_file(
    path: &Path,
    source: &BindingSource,
) -> Result<Vec<ResolvedKeybinding>, KeymapError> {
    let content = std::fs::read_to_string(path).map_err(|e| KeymapError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_keymap_yaml(&content, source)
}

/// Parse keybindings from YAML string
///
/// `source` is the provenance recorded on every rule; an entry's own
/// `extension` field takes precedence.
pub fn parse_keymap_yaml(
    yaml: &str,
    source: &BindingSource,
) -> Result<Vec<ResolvedKeybinding>, KeymapError> {
    let config: KeymapConfig =
        serde_yaml::from_str(yaml).map_err(|e| KeymapError::Parse(e.to_string()))?;

    let current_platform = get_current_platform();
    let mut bindings = Vec::with_capacity(config.bindings.len());

    for entry in config.bindings {
        // Skip if platform-specific and doesn't match current platform
        if let Some(ref platform) = entry.platform {
            if platform != current_platform {
                continue;
            }
        }

        bindings.push(parse_entry(entry, source)?);
    }

    Ok(bindings)
}

fn parse_entry(
    entry: BindingConfig,
    source: &BindingSource,
) -> Result<ResolvedKeybinding, KeymapError> {
    if let Some(ref command) = entry.command {
        validate_command(command)?;
    }

    let sequence = entry
        .key
        .as_deref()
        .map(str::parse::<KeySequence>)
        .transpose()?;
    let when = entry.when.as_deref().map(parse_when).transpose()?;

    let source = match entry.extension {
        Some(id) => BindingSource::extension(id, entry.builtin, source.is_default),
        None => source.clone(),
    };

    Ok(ResolvedKeybinding::<WhenExpr>::new(
        sequence.as_ref(),
        entry.command.as_deref(),
        entry.args.unwrap_or(Value::Null),
        when,
        entry.timeout,
        source,
    ))
}

/// Command ids are non-empty and contain no whitespace once markers are stripped
fn validate_command(command: &str) -> Result<(), KeymapError> {
    let bare = command.strip_prefix(BUBBLE_PREFIX).unwrap_or(command);
    let bare = bare.strip_prefix(REMOVAL_PREFIX).unwrap_or(bare);

    if bare.is_empty() || bare.chars().any(char::is_whitespace) {
        return Err(KeymapError::InvalidCommand(command.to_string()));
    }
    Ok(())
}

/// Get the current platform identifier
fn get_current_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "linux"
    }
}
