//! Lookup structures built from the merged rule list
//!
//! Two independent indices:
//! - by first key press: every indexed rule in merge order. `resolve` scans
//!   these buckets from the end, so later rules win.
//! - by command: rules reachable for "what is bound to command X". A rule is
//!   left out when a later rule on the same first key, for a different
//!   command, has a guard that covers it.
//!
//! Pruning only affects the by-command index. Forward buckets keep every rule,
//! because resolution re-checks guards on each key press anyway.

use std::collections::HashMap;
use std::sync::Arc;

use super::binding::ResolvedKeybinding;
use super::context::WhenClause;
use super::implication::when_is_entirely_included;
use super::types::Keystroke;

type Rule<E> = Arc<ResolvedKeybinding<E>>;

#[derive(Debug)]
pub struct KeybindingIndex<E> {
    by_first_key: HashMap<Keystroke, Vec<Rule<E>>>,
    by_command: HashMap<String, Vec<Rule<E>>>,
}

impl<E: WhenClause> KeybindingIndex<E> {
    /// Build both indices from rules in merge order
    pub fn build(rules: &[Rule<E>]) -> Self {
        // Pass 1: bucket positions and mark rules covered by a later rule
        let mut buckets: HashMap<Keystroke, Vec<usize>> = HashMap::new();
        let mut registered = Vec::with_capacity(rules.len());
        let mut covered = vec![false; rules.len()];

        for (idx, item) in rules.iter().enumerate() {
            let Some(first) = item.first_part() else {
                // unbound
                continue;
            };
            if item.when.as_ref().is_some_and(WhenClause::is_always_false) {
                continue;
            }

            let bucket = buckets.entry(*first).or_default();
            for &conflict_idx in bucket.iter().rev() {
                let conflict = &rules[conflict_idx];

                if conflict.command == item.command {
                    continue;
                }

                // The conflict only shares the chord start with this rule
                if conflict.is_chord() && item.is_chord() && conflict.chord_part() != item.chord_part()
                {
                    continue;
                }

                if when_is_entirely_included(conflict.when.as_ref(), item.when.as_ref()) {
                    covered[conflict_idx] = true;
                }
            }

            bucket.push(idx);
            registered.push(idx);
        }

        // Pass 2: materialize the forward buckets and the filtered reverse map
        let by_first_key: HashMap<Keystroke, Vec<Rule<E>>> = buckets
            .into_iter()
            .map(|(key, positions)| {
                let bucket = positions.iter().map(|&i| Arc::clone(&rules[i])).collect();
                (key, bucket)
            })
            .collect();

        let mut by_command: HashMap<String, Vec<Rule<E>>> = HashMap::new();
        for idx in registered {
            if covered[idx] {
                continue;
            }
            if let Some(command) = &rules[idx].command {
                by_command
                    .entry(command.clone())
                    .or_default()
                    .push(Arc::clone(&rules[idx]));
            }
        }

        tracing::debug!(
            "Indexed {} rules under {} first keys, {} commands",
            rules.len(),
            by_first_key.len(),
            by_command.len()
        );

        Self {
            by_first_key,
            by_command,
        }
    }
}

impl<E> KeybindingIndex<E> {
    /// Rules whose first key press is `keypress`, in merge order
    pub fn candidates(&self, keypress: &Keystroke) -> Option<&[Rule<E>]> {
        self.by_first_key.get(keypress).map(Vec::as_slice)
    }

    /// Reachable rules for `command`, in merge order (lowest priority first)
    pub fn for_command(&self, command: &str) -> &[Rule<E>] {
        self.by_command
            .get(command)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of distinct first key presses
    pub fn key_count(&self) -> usize {
        self.by_first_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_first_key.is_empty()
    }
}
