//! Keymap session: a resolver plus the chord state between key presses

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::context::WhenClause;
use super::resolver::{CurrentChord, KeybindingResolver, ResolveResult};
use super::types::Keystroke;
use super::when::WhenExpr;

#[derive(Debug, Clone)]
struct PendingChord {
    chord: CurrentChord,
    /// Longest timeout among the chords that could still complete
    max_timeout: u64,
}

/// Feeds key presses to a shared resolver, remembering a started chord
///
/// The resolver itself is immutable; a reloaded keymap is swapped in with
/// [`Keymap::replace_resolver`].
#[derive(Debug)]
pub struct Keymap<E = WhenExpr> {
    resolver: Arc<KeybindingResolver<E>>,
    pending: Option<PendingChord>,
}

impl<E> Clone for Keymap<E> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            pending: self.pending.clone(),
        }
    }
}

impl<E: WhenClause> Keymap<E> {
    pub fn new(resolver: Arc<KeybindingResolver<E>>) -> Self {
        Self {
            resolver,
            pending: None,
        }
    }

    pub fn resolver(&self) -> &Arc<KeybindingResolver<E>> {
        &self.resolver
    }

    /// Swap in a rebuilt resolver; a chord in progress is abandoned
    pub fn replace_resolver(&mut self, resolver: Arc<KeybindingResolver<E>>) {
        self.resolver = resolver;
        self.reset();
    }

    /// Clear pending chord state
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Handle a key press now
    pub fn handle_keystroke(&mut self, context: &E::Context, keystroke: &Keystroke) -> ResolveResult {
        self.handle_keystroke_at(context, keystroke, Instant::now())
    }

    /// Handle a key press that happened at `now`
    ///
    /// A chord that waited longer than every candidate allows is dropped first,
    /// so the key press is resolved as a fresh one.
    pub fn handle_keystroke_at(
        &mut self,
        context: &E::Context,
        keystroke: &Keystroke,
        now: Instant,
    ) -> ResolveResult {
        self.expire_pending(now);

        let chord = self.pending.as_ref().map(|p| &p.chord);
        let result = self.resolver.resolve_at(context, chord, keystroke, now);

        self.pending = match result {
            ResolveResult::EnterChord { max_timeout } => Some(PendingChord {
                chord: CurrentChord::new(*keystroke, now),
                max_timeout,
            }),
            _ => None,
        };

        result
    }

    /// Drop the pending chord if it can no longer complete at `now`
    ///
    /// Returns true if a chord was dropped. Callers with an idle timer use this
    /// to clear a status bar hint.
    pub fn expire_pending(&mut self, now: Instant) -> bool {
        let expired = self.pending.as_ref().is_some_and(|p| {
            now.saturating_duration_since(p.chord.enter_time) > Duration::from_millis(p.max_timeout)
        });

        if expired {
            if let Some(p) = self.pending.take() {
                tracing::debug!("Chord {} timed out", p.chord.keypress);
            }
        }
        expired
    }

    /// Check if any chord is in progress
    pub fn has_pending_chord(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending chord's first key press (for status bar display)
    pub fn pending_chord_display(&self) -> Option<String> {
        self.pending
            .as_ref()
            .and_then(|p| p.chord.label.clone())
    }

    /// When the pending chord stops accepting a second key press
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending
            .as_ref()
            .map(|p| p.chord.enter_time + Duration::from_millis(p.max_timeout))
    }

    /// Display string of the primary binding for `command`, e.g. for menus
    pub fn display_for(&self, command: &str) -> Option<String> {
        self.resolver
            .lookup_primary_keybinding(command)
            .map(|kb| kb.display_string())
    }
}
