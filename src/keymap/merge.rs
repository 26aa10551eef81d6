//! Merging default rules with user overrides
//!
//! Overrides whose command starts with `-` are removal directives: they delete
//! matching default rules and are themselves dropped. Every other override is
//! appended after the surviving defaults. The merged order is the priority
//! order the resolver uses (later wins).

use std::sync::Arc;

use super::binding::ResolvedKeybinding;
use super::context::WhenClause;
use super::types::Keystroke;

/// Apply removal directives from `overrides` to `defaults`, then append the rest
pub fn combine<E: WhenClause>(
    defaults: &[Arc<ResolvedKeybinding<E>>],
    overrides: &[Arc<ResolvedKeybinding<E>>],
) -> Vec<Arc<ResolvedKeybinding<E>>> {
    let mut result = defaults.to_vec();
    let mut additions = Vec::with_capacity(overrides.len());

    for rule in overrides {
        let Some(command) = rule.removal_target() else {
            additions.push(Arc::clone(rule));
            continue;
        };

        let before = result.len();
        result.retain(|default| {
            !is_targeted_for_removal(
                default,
                rule.first_part(),
                rule.chord_part(),
                command,
                rule.when.as_ref(),
            )
        });

        // Removals that match nothing are fine: they often target rules of
        // extensions that are not installed.
        tracing::trace!(
            "Removal of {} matched {} default rule(s)",
            command,
            before - result.len()
        );
    }

    result.extend(additions);
    result
}

fn is_targeted_for_removal<E: WhenClause>(
    default: &ResolvedKeybinding<E>,
    first: Option<&Keystroke>,
    chord: Option<&Keystroke>,
    command: &str,
    when: Option<&E>,
) -> bool {
    if default.command.as_deref() != Some(command) {
        return false;
    }
    if first.is_some() && default.first_part() != first {
        return false;
    }
    if chord.is_some() && default.chord_part() != chord {
        return false;
    }
    if let Some(when) = when {
        match &default.when {
            Some(default_when) if when.equals(default_when) => {}
            _ => return false,
        }
    }
    true
}
