//! Default keybindings and layered loading
//!
//! The default keymap ships inside the binary. Project and user keymaps are
//! layered on top as overrides. They never replace the defaults: the resolver
//! merges them, so `-command` entries can remove what ships by default.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::binding::{BindingSource, ResolvedKeybinding};
use super::config::{load_keymap_file, parse_keymap_yaml, KeymapError};
use super::resolver::KeybindingResolver;
use crate::config_paths;

/// Default keymap YAML embedded at compile time
pub const DEFAULT_KEYMAP_YAML: &str = include_str!("../../keymap.yaml");

type Rule = Arc<ResolvedKeybinding>;

/// Parse the embedded default keymap
///
/// A broken embedded keymap is logged and yields no defaults rather than
/// taking the process down.
pub fn load_default_keymap() -> Vec<ResolvedKeybinding> {
    match parse_keymap_yaml(DEFAULT_KEYMAP_YAML, &BindingSource::builtin()) {
        Ok(bindings) => {
            tracing::info!("Loaded embedded default keymap ({} bindings)", bindings.len());
            bindings
        }
        Err(e) => {
            tracing::warn!("Failed to parse embedded keymap: {}", e);
            Vec::new()
        }
    }
}

/// Override files in load order (each layer overrides the previous)
///
/// 1. keymap.yaml in current directory (project-local overrides)
/// 2. User config at ~/.config/keychord/keymap.yaml
pub fn override_paths() -> Vec<PathBuf> {
    let mut paths = vec![config_paths::project_keymap_file()];
    if let Some(user) = config_paths::keymap_file() {
        paths.push(user);
    }
    paths
}

/// Read override layers, stopping at the first broken file
///
/// Missing files are skipped.
pub fn read_overrides(paths: &[PathBuf]) -> Result<Vec<Rule>, KeymapError> {
    let mut overrides = Vec::new();
    for path in paths {
        if !path.exists() {
            continue;
        }
        let bindings = load_keymap_file(path, &BindingSource::user())?;
        tracing::info!(
            "Merging keymap from {} ({} bindings)",
            path.display(),
            bindings.len()
        );
        overrides.extend(bindings.into_iter().map(Arc::new));
    }
    Ok(overrides)
}

/// Default rules and override rules, kept apart until a resolver merges them
#[derive(Debug, Clone, Default)]
pub struct KeymapLayers {
    pub defaults: Vec<Rule>,
    pub overrides: Vec<Rule>,
}

impl KeymapLayers {
    /// Embedded defaults plus every readable override file
    ///
    /// A file that fails to load is logged and skipped; the remaining layers
    /// still apply.
    pub fn load(paths: &[PathBuf]) -> Self {
        let defaults = load_default_keymap().into_iter().map(Arc::new).collect();

        let mut overrides = Vec::new();
        for path in paths {
            match read_layer(path) {
                Ok(Some(rules)) => overrides.extend(rules),
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to load keymap from {}: {}", path.display(), e),
            }
        }

        Self {
            defaults,
            overrides,
        }
    }

    /// Defaults only, no override files
    pub fn defaults_only() -> Self {
        Self::load(&[])
    }

    /// Build a resolver sharing this set's rules
    pub fn resolver(&self) -> KeybindingResolver {
        KeybindingResolver::from_shared(self.defaults.clone(), self.overrides.clone())
    }

    pub fn into_resolver(self) -> KeybindingResolver {
        KeybindingResolver::from_shared(self.defaults, self.overrides)
    }
}

fn read_layer(path: &Path) -> Result<Option<Vec<Rule>>, KeymapError> {
    if !path.exists() {
        return Ok(None);
    }
    read_overrides(&[path.to_path_buf()]).map(Some)
}
