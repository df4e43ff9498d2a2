//! Matchers: select a constraint-satisfying subset of scored candidates.
//!
//! Every solver implements [`Matcher`]. A call owns all of its search state
//! (constraint states, beam, tree, matrices) and drops it on return, so one
//! matcher value can serve any number of calls.

pub mod beam_search;
pub mod greedy;
pub mod mcts;
pub mod prematcher;
pub mod threshold;
pub mod unique;

pub use beam_search::{Beam, BeamSearch};
pub use greedy::Greedy;
pub use mcts::MonteCarloTreeSearch;
pub use prematcher::Prematcher;
pub use threshold::Threshold;
pub use unique::UniqueAssignment;

use std::fmt;

use crate::alignment_set::AlignmentSet;
use crate::constraint::{Constraint, ConstraintFactory};
use crate::error::AlignResult;
use crate::listener::{Level, MatchListener, NoopListener, Stage};

/// Common contract of all solvers.
pub trait Matcher: fmt::Debug + Send + Sync {
    /// Registry id of this matcher (for example `"greedy"`).
    fn id(&self) -> &'static str;

    /// Selects the final alignments from `matches`.
    ///
    /// Every alignment in `initial` is authoritative and appears unchanged
    /// in the result (except for the plain threshold filter, which applies
    /// its cut to both sets).
    ///
    /// # Errors
    ///
    /// `MatchError::Unsolvable` if no complete solution was reached, or a
    /// solver-specific failure.
    fn align_with(
        &self,
        matches: AlignmentSet,
        initial: &AlignmentSet,
        listener: &dyn MatchListener,
    ) -> AlignResult<AlignmentSet>;

    /// Aligns with no partial solution and no listener.
    ///
    /// # Errors
    ///
    /// As [`Matcher::align_with`].
    fn align(&self, matches: AlignmentSet) -> AlignResult<AlignmentSet> {
        self.align_with(matches, &AlignmentSet::new(), &NoopListener)
    }
}

/// Builds the starting state: an empty constraint with every initial
/// alignment forced in. Alignments the constraint would refuse are still
/// added, with a warning. Each relation in `matches` the constraint can never
/// accept is warned about once.
pub(crate) fn seed_constraint(
    factory: &dyn ConstraintFactory,
    initial: &AlignmentSet,
    matches: &AlignmentSet,
    listener: &dyn MatchListener,
) -> Box<dyn Constraint> {
    let mut constraint = factory.make();
    for relation in matches.relations() {
        if !constraint.supports(&relation) {
            tracing::warn!(%relation, "relation not supported by the constraint");
        }
    }
    for init in initial {
        if !constraint.can_add(init) {
            tracing::warn!(alignment = %init, "initial link violates the constraint");
            listener.message(
                Stage::Matching,
                Level::Warning,
                "A link from the initial set is not valid with the constraint.",
            );
        }
        constraint.add(init);
    }
    constraint
}

/// Replaces `best` with a copy of `candidate` if it is complete and scores higher.
pub(crate) fn keep_if_better(best: &mut Option<Box<dyn Constraint>>, candidate: &dyn Constraint) {
    if !candidate.complete() {
        return;
    }
    let better = best
        .as_ref()
        .map_or(true, |b| candidate.score() > b.score());
    if better {
        *best = Some(candidate.copy());
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::alignment::Alignment;
    use crate::alignment_set::AlignmentSet;
    pub use crate::constraint::test_support::{al, e};

    /// Sum of raw scores.
    pub fn total(set: &AlignmentSet) -> f64 {
        set.iter().map(|a| a.score).sum()
    }

    pub fn set(items: &[(&str, &str, f64)]) -> AlignmentSet {
        items
            .iter()
            .map(|(l, r, s)| al(l, r, *s))
            .collect::<Vec<Alignment>>()
            .into()
    }
}
