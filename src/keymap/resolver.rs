//! Resolving key presses against the merged keymap
//!
//! A [`KeybindingResolver`] is built once from default rules and overrides and
//! is read-only afterwards. Changing the rules means building a new resolver.
//!
//! Chord state belongs to the caller: when `resolve` answers
//! [`ResolveResult::EnterChord`], the caller remembers the key press and the
//! time in a [`CurrentChord`] and passes it back with the next key press.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::binding::ResolvedKeybinding;
use super::context::WhenClause;
use super::implication;
use super::index::KeybindingIndex;
use super::merge;
use super::types::Keystroke;
use super::when::WhenExpr;

/// Diagnostics sink receiving one human-readable line per resolution step
pub type LogSink = Box<dyn Fn(&str) + Send + Sync>;

/// A chord in progress: the first key press and when it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentChord {
    pub keypress: Keystroke,
    /// Display label for status bars
    pub label: Option<String>,
    pub enter_time: Instant,
}

impl CurrentChord {
    pub fn new(keypress: Keystroke, enter_time: Instant) -> Self {
        Self {
            keypress,
            label: Some(keypress.display_string()),
            enter_time,
        }
    }
}

/// Outcome of resolving one key press
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveResult {
    /// Nothing is bound (or no guard matched); let the key through
    NoMatch,
    /// Run a single-key binding
    Dispatch {
        command: Option<String>,
        args: Value,
        bubble: bool,
    },
    /// The key press may start a chord; wait up to `max_timeout` ms for the next key
    EnterChord { max_timeout: u64 },
    /// The second key press completed a chord
    LeaveChord {
        command: Option<String>,
        args: Value,
        bubble: bool,
    },
}

impl ResolveResult {
    /// The command to run, if this outcome runs one
    pub fn command(&self) -> Option<&str> {
        match self {
            ResolveResult::Dispatch { command, .. } | ResolveResult::LeaveChord { command, .. } => {
                command.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, ResolveResult::NoMatch)
    }

    pub fn is_enter_chord(&self) -> bool {
        matches!(self, ResolveResult::EnterChord { .. })
    }
}

impl fmt::Display for ResolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveResult::NoMatch => write!(f, "no match"),
            ResolveResult::Dispatch {
                command, bubble, ..
            } => write!(
                f,
                "dispatch {}{}",
                command.as_deref().unwrap_or("<unbound>"),
                if *bubble { " (bubble)" } else { "" }
            ),
            ResolveResult::EnterChord { max_timeout } => {
                write!(f, "enter chord (timeout {}ms)", max_timeout)
            }
            ResolveResult::LeaveChord {
                command, bubble, ..
            } => write!(
                f,
                "leave chord: {}{}",
                command.as_deref().unwrap_or("<unbound>"),
                if *bubble { " (bubble)" } else { "" }
            ),
        }
    }
}

type Rule<E> = Arc<ResolvedKeybinding<E>>;

fn trace_line(line: &str) {
    tracing::debug!(target: "keychord::resolve", "{}", line);
}

pub struct KeybindingResolver<E = WhenExpr> {
    log: LogSink,
    default_keybindings: Vec<Rule<E>>,
    keybindings: Vec<Rule<E>>,
    default_bound_commands: HashSet<String>,
    index: KeybindingIndex<E>,
}

impl<E: WhenClause> KeybindingResolver<E> {
    /// Build a resolver that reports its decisions through `tracing`
    pub fn new(defaults: Vec<ResolvedKeybinding<E>>, overrides: Vec<ResolvedKeybinding<E>>) -> Self {
        Self::from_shared(
            defaults.into_iter().map(Arc::new).collect(),
            overrides.into_iter().map(Arc::new).collect(),
        )
    }

    /// Like [`KeybindingResolver::new`], for rules that are already shared
    ///
    /// Reloading overrides reuses the same default rules this way.
    pub fn from_shared(defaults: Vec<Rule<E>>, overrides: Vec<Rule<E>>) -> Self {
        Self::with_log(defaults, overrides, trace_line)
    }

    /// Build a resolver with a custom diagnostics sink
    pub fn with_log(
        defaults: Vec<Rule<E>>,
        overrides: Vec<Rule<E>>,
        log: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        let default_bound_commands = defaults
            .iter()
            .filter_map(|kb| kb.command.as_deref())
            .filter(|cmd| !cmd.is_empty())
            .map(str::to_string)
            .collect();

        let keybindings = merge::combine(&defaults, &overrides);
        let index = KeybindingIndex::build(&keybindings);

        Self {
            log: Box::new(log),
            default_keybindings: defaults,
            keybindings,
            default_bound_commands,
            index,
        }
    }

    /// See [`merge::combine`]
    pub fn combine(defaults: &[Rule<E>], overrides: &[Rule<E>]) -> Vec<Rule<E>> {
        merge::combine(defaults, overrides)
    }

    /// Returns true if it is provable that `a` implies `b`
    pub fn when_is_entirely_included(a: Option<&E>, b: Option<&E>) -> bool {
        implication::when_is_entirely_included(a, b)
    }

    /// A missing guard always matches
    pub fn context_matches_rules(context: &E::Context, rules: Option<&E>) -> bool {
        match rules {
            Some(when) => when.evaluate(context),
            None => true,
        }
    }

    /// Commands bound by at least one default rule
    pub fn default_bound_commands(&self) -> &HashSet<String> {
        &self.default_bound_commands
    }

    pub fn default_keybindings(&self) -> &[Rule<E>] {
        &self.default_keybindings
    }

    /// The merged rule list, in priority order (last wins)
    pub fn keybindings(&self) -> &[Rule<E>] {
        &self.keybindings
    }

    /// Rules bound to `command_id`, most specific first
    pub fn lookup_keybindings(&self, command_id: &str) -> Vec<Rule<E>> {
        self.index
            .for_command(command_id)
            .iter()
            .rev()
            .cloned()
            .collect()
    }

    /// The highest-priority rule bound to `command_id`
    pub fn lookup_primary_keybinding(&self, command_id: &str) -> Option<Rule<E>> {
        self.index.for_command(command_id).last().cloned()
    }

    /// Resolve `keypress` now
    pub fn resolve(
        &self,
        context: &E::Context,
        current_chord: Option<&CurrentChord>,
        keypress: &Keystroke,
    ) -> ResolveResult {
        self.resolve_at(context, current_chord, keypress, Instant::now())
    }

    /// Resolve `keypress` as if it happened at `now`
    pub fn resolve_at(
        &self,
        context: &E::Context,
        current_chord: Option<&CurrentChord>,
        keypress: &Keystroke,
        now: Instant,
    ) -> ResolveResult {
        match current_chord {
            Some(chord) => {
                (self.log)(&format!(
                    "| Resolving {} chorded from {}",
                    keypress, chord.keypress
                ));
                self.resolve_chord(context, chord, keypress, now)
            }
            None => {
                (self.log)(&format!("| Resolving {}", keypress));
                self.resolve_first(context, keypress)
            }
        }
    }

    fn resolve_chord(
        &self,
        context: &E::Context,
        chord: &CurrentChord,
        keypress: &Keystroke,
        now: Instant,
    ) -> ResolveResult {
        let Some(candidates) = self.index.candidates(&chord.keypress) else {
            (self.log)("\\ No keybinding entries.");
            return ResolveResult::NoMatch;
        };

        let elapsed = now.saturating_duration_since(chord.enter_time);

        // Later definitions have higher priority
        for candidate in candidates.iter().rev() {
            if candidate.chord_part() == Some(keypress)
                && Self::context_matches_rules(context, candidate.when.as_ref())
                && elapsed <= Duration::from_millis(candidate.timeout)
            {
                self.log_match(candidates.len(), candidate);
                return ResolveResult::LeaveChord {
                    command: candidate.command.clone(),
                    args: candidate.command_args.clone(),
                    bubble: candidate.bubble,
                };
            }
        }

        (self.log)(&format!(
            "\\ From {} keybinding entries, no when clauses matched the context.",
            candidates.len()
        ));
        ResolveResult::NoMatch
    }

    fn resolve_first(&self, context: &E::Context, keypress: &Keystroke) -> ResolveResult {
        let Some(candidates) = self.index.candidates(keypress) else {
            (self.log)("\\ No keybinding entries.");
            return ResolveResult::NoMatch;
        };

        // Several chords may start with this key; the next key press decides
        let mut chord_candidates: Option<Vec<&Rule<E>>> = None;
        let mut max_chord_timeout = 0;

        for candidate in candidates.iter().rev() {
            if !Self::context_matches_rules(context, candidate.when.as_ref()) {
                continue;
            }

            match chord_candidates.as_mut() {
                None if !candidate.is_chord() => {
                    self.log_match(candidates.len(), candidate);
                    return ResolveResult::Dispatch {
                        command: candidate.command.clone(),
                        args: candidate.command_args.clone(),
                        bubble: candidate.bubble,
                    };
                }
                None => {
                    chord_candidates = Some(vec![candidate]);
                    max_chord_timeout = candidate.timeout;
                }
                // In chord mode, single-key rules are shadowed
                Some(chords) => {
                    if candidate.chord_part().is_some() {
                        chords.push(candidate);
                        max_chord_timeout = max_chord_timeout.max(candidate.timeout);
                    }
                }
            }
        }

        let Some(chords) = chord_candidates else {
            (self.log)(&format!(
                "\\ From {} keybinding entries, no when clauses matched the context.",
                candidates.len()
            ));
            return ResolveResult::NoMatch;
        };

        (self.log)(&format!(
            "\\ From {} keybinding entries, matched {} chord.",
            candidates.len(),
            chords.len()
        ));
        ResolveResult::EnterChord {
            max_timeout: max_chord_timeout,
        }
    }

    fn log_match(&self, candidate_count: usize, kb: &ResolvedKeybinding<E>) {
        let when = kb
            .when
            .as_ref()
            .map(WhenClause::serialize)
            .unwrap_or_else(|| "no when condition".to_string());

        (self.log)(&format!(
            "\\ From {} keybinding entries, matched {}, when: {}, source: {}.",
            candidate_count,
            kb.command.as_deref().unwrap_or("null"),
            when,
            kb.source.describe()
        ));
    }
}

impl<E> fmt::Debug for KeybindingResolver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeybindingResolver")
            .field("default_keybindings", &self.default_keybindings.len())
            .field("keybindings", &self.keybindings.len())
            .field("default_bound_commands", &self.default_bound_commands.len())
            .finish_non_exhaustive()
    }
}
