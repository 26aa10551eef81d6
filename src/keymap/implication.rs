//! Guard subsumption
//!
//! Decides whether one `when` guard provably implies another. The check is a
//! single resolution step over the disjuncts of `¬a` and `b`: if some clause
//! of one is the negation of a clause of the other, `¬a ∨ b` is a tautology
//! and `a → b` holds. It never reports an implication that does not hold, and
//! it misses implications that need more than one step.

use super::context::WhenClause;

/// Returns true if it is provable that `a` implies `b`
///
/// A missing guard means "always". Anything implies "always"; "always"
/// implies nothing conditional.
pub fn when_is_entirely_included<E: WhenClause>(a: Option<&E>, b: Option<&E>) -> bool {
    let Some(b) = b else {
        return true;
    };
    let Some(a) = a else {
        return false;
    };

    implies(a, b)
}

fn implies<E: WhenClause>(p: &E, q: &E) -> bool {
    let not_p = p.negate();

    let terms: Vec<&E> = terminals(&not_p).iter().chain(terminals(q)).collect();
    for (i, a) in terms.iter().enumerate() {
        let not_a = a.negate();
        if terms[i + 1..].iter().any(|b| not_a.equals(b)) {
            return true;
        }
    }

    false
}

/// Disjuncts of an Or node, or the node itself
fn terminals<E: WhenClause>(node: &E) -> &[E] {
    node.disjuncts().unwrap_or(std::slice::from_ref(node))
}
