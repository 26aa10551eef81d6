//! Reloading keymap overrides when their files change
//!
//! Uses the `notify` crate with debouncing. The watcher never touches a live
//! resolver: on change it builds a fresh one that the caller swaps in.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};

use super::binding::ResolvedKeybinding;
use super::defaults::read_overrides;
use super::resolver::KeybindingResolver;

type DebounceResult = Result<Vec<DebouncedEvent>, notify::Error>;

/// Watches keymap override files and rebuilds the resolver on change
pub struct KeymapWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    rx: Receiver<DebounceResult>,
    /// Override files in load order, all re-read on any change
    layers: Vec<PathBuf>,
}

impl KeymapWatcher {
    /// Watch a single keymap file
    pub fn new(path: PathBuf) -> Result<Self, notify::Error> {
        Self::with_layers(vec![path])
    }

    /// Watch every override layer
    ///
    /// Files are watched through their parent directory so a file that is
    /// created or replaced later is still picked up. Layers whose directory
    /// does not exist are not watched.
    pub fn with_layers(layers: Vec<PathBuf>) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();

        // 500ms debounce delay, editors often write a file in several steps
        let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

        let mut watched: Vec<PathBuf> = Vec::new();
        for layer in &layers {
            let dir = watch_dir(layer);
            if watched.contains(&dir) {
                continue;
            }
            if !dir.is_dir() {
                tracing::info!("Not watching {}: directory does not exist", dir.display());
                continue;
            }
            debouncer
                .watcher()
                .watch(&dir, notify::RecursiveMode::NonRecursive)?;
            tracing::info!("Watching {} for keymap changes", dir.display());
            watched.push(dir);
        }

        Ok(Self {
            _debouncer: debouncer,
            rx,
            layers,
        })
    }

    pub fn layers(&self) -> &[PathBuf] {
        &self.layers
    }

    /// Drain pending events (non-blocking); true if a keymap file changed
    pub fn poll_changed(&self) -> bool {
        let mut changed = false;

        while let Ok(result) = self.rx.try_recv() {
            match result {
                Ok(events) => {
                    for event in events {
                        if matches!(event.kind, DebouncedEventKind::AnyContinuous) {
                            continue;
                        }
                        if self.is_layer(&event.path) {
                            tracing::debug!("Keymap file changed: {}", event.path.display());
                            changed = true;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Keymap watcher error: {:?}", e);
                }
            }
        }

        changed
    }

    /// Rebuild the resolver if any layer changed since the last poll
    ///
    /// Returns `None` when nothing changed or the new overrides fail to load;
    /// in the latter case the caller keeps its previous resolver.
    pub fn poll_reload(
        &self,
        defaults: &[Arc<ResolvedKeybinding>],
    ) -> Option<Arc<KeybindingResolver>> {
        if !self.poll_changed() {
            return None;
        }
        self.reload(defaults)
    }

    /// Re-read every layer and build a new resolver
    pub fn reload(&self, defaults: &[Arc<ResolvedKeybinding>]) -> Option<Arc<KeybindingResolver>> {
        match read_overrides(&self.layers) {
            Ok(overrides) => {
                tracing::info!("Reloaded keymap ({} overrides)", overrides.len());
                Some(Arc::new(KeybindingResolver::from_shared(
                    defaults.to_vec(),
                    overrides,
                )))
            }
            Err(e) => {
                tracing::warn!("Keeping previous keymap, reload failed: {}", e);
                None
            }
        }
    }

    /// Events may report canonicalized paths, so only file names are compared
    fn is_layer(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        self.layers
            .iter()
            .any(|layer| layer.file_name() == Some(name))
    }
}

fn watch_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
