//! Greedy selection in canonical order.

use std::sync::Arc;

use crate::alignment_set::AlignmentSet;
use crate::constraint::{Constraint, ConstraintFactory};
use crate::error::{AlignResult, MatchError};
use crate::listener::{MatchListener, Stage};
use crate::matcher::{keep_if_better, seed_constraint, Matcher};

/// Accepts candidates best-first whenever the constraint allows it.
///
/// The running state is mutated in place. The best complete state seen
/// (the seeded state included) is the answer; after the seed, a state is
/// only considered when [`Constraint::can_complete`] held for the step that
/// produced it.
#[derive(Debug, Clone)]
pub struct Greedy {
    constraint: Arc<dyn ConstraintFactory>,
    threshold: f64,
}

impl Greedy {
    /// A greedy matcher over the given constraint, with no threshold.
    #[must_use]
    pub fn new(constraint: impl ConstraintFactory + 'static) -> Self {
        Self::from_factory(Arc::new(constraint))
    }

    /// A greedy matcher over a shared constraint factory.
    #[must_use]
    pub fn from_factory(constraint: Arc<dyn ConstraintFactory>) -> Self {
        Self {
            constraint,
            threshold: f64::NEG_INFINITY,
        }
    }

    /// Sets the minimum score a candidate needs to be considered.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

impl Matcher for Greedy {
    fn id(&self) -> &'static str {
        "greedy"
    }

    fn align_with(
        &self,
        mut matches: AlignmentSet,
        initial: &AlignmentSet,
        listener: &dyn MatchListener,
    ) -> AlignResult<AlignmentSet> {
        let mut state = seed_constraint(self.constraint.as_ref(), initial, &matches, listener);
        let mut best: Option<Box<dyn Constraint>> = None;
        keep_if_better(&mut best, state.as_ref());

        matches.sort_alignments();
        if matches.is_empty() {
            listener.update_status(Stage::Matching, "No alignments generated");
        }

        let mut over_threshold = 0usize;
        let mut non_finite = 0usize;
        for alignment in &matches {
            if !alignment.score.is_finite() {
                non_finite += 1;
                continue;
            }
            if alignment.score < self.threshold || !state.can_add(alignment) {
                continue;
            }
            over_threshold += 1;
            let completes = state.can_complete(alignment);
            state.add(alignment);
            if completes {
                keep_if_better(&mut best, state.as_ref());
            }
        }

        let Some(best) = best else {
            return Err(MatchError::unsolvable(self.id(), "No complete solution was generated").into());
        };
        let accepted = best.alignments();
        listener.update_status(
            Stage::Matching,
            &format!(
                "Predicted {}/{} alignments ({} non-finite, score={:.4})",
                accepted.len(),
                over_threshold,
                non_finite,
                best.score()
            ),
        );
        tracing::info!(
            accepted = accepted.len(),
            candidates = matches.len(),
            score = best.score(),
            "greedy matching finished"
        );
        Ok(AlignmentSet::from_vec(accepted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Bijective, Capacity, ThresholdConstraint};
    use crate::listener::{Level, NoopListener, RecordingListener};
    use crate::matcher::test_support::{al, set, total};

    #[test]
    fn picks_best_first_under_bijection() {
        let matches = set(&[("a", "x", 0.9), ("a", "y", 0.85), ("b", "x", 0.8), ("b", "y", 0.1)]);
        let out = Greedy::new(Bijective::default()).align(matches).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.contains(&al("a", "x", 0.9)));
        assert!(out.contains(&al("b", "y", 0.1)));
    }

    #[test]
    fn threshold_skips_weak_candidates() {
        let matches = set(&[("a", "x", 0.9), ("b", "y", 0.1)]);
        let out = Greedy::new(Bijective::default())
            .with_threshold(0.5)
            .align(matches)
            .unwrap();
        assert_eq!(out.into_vec(), vec![al("a", "x", 0.9)]);
    }

    #[test]
    fn initial_links_are_kept_and_block_conflicts() {
        let matches = set(&[("a", "x", 0.9), ("b", "y", 0.6)]);
        let initial = set(&[("a", "z", 1.0)]);
        let out = Greedy::new(Bijective::default())
            .align_with(matches, &initial, &NoopListener)
            .unwrap();
        assert!(out.contains(&al("a", "z", 1.0)));
        assert!(out.contains(&al("b", "y", 0.6)));
        assert!(!out.contains(&al("a", "x", 0.9)));
    }

    #[test]
    fn empty_input_reports_and_returns_initial() {
        let rec = RecordingListener::new();
        let initial = set(&[("a", "x", 1.0)]);
        let out = Greedy::new(ThresholdConstraint::default())
            .align_with(AlignmentSet::new(), &initial, &rec)
            .unwrap();
        assert_eq!(out, initial);
        let messages = rec.at_level(Level::Info);
        assert!(messages.iter().any(|m| m.message == "No alignments generated"));
        assert!(messages.iter().any(|m| m.message.starts_with("Predicted 1/0")));
    }

    #[test]
    fn unsolvable_when_never_complete() {
        let matches = set(&[("a", "x", 0.9), ("a", "y", 0.8)]);
        let constraint = Capacity {
            min_alignments: 2,
            ..Capacity::default()
        };
        let err = Greedy::new(constraint).align(matches).unwrap_err();
        assert!(err.is_unsolvable());
    }

    /// Accepts anything but never claims a step completes it.
    #[derive(Debug, Clone, Default)]
    struct NeverCompletes(Vec<crate::alignment::Alignment>);

    impl Constraint for NeverCompletes {
        fn can_add(&self, _alignment: &crate::alignment::Alignment) -> bool {
            true
        }

        fn add(&mut self, alignment: &crate::alignment::Alignment) {
            self.0.push(alignment.clone());
        }

        fn can_complete(&self, _alignment: &crate::alignment::Alignment) -> bool {
            false
        }

        #[allow(clippy::cast_precision_loss)]
        fn score(&self) -> f64 {
            self.0.len() as f64
        }

        fn copy(&self) -> Box<dyn Constraint> {
            Box::new(self.clone())
        }

        fn alignments(&self) -> Vec<crate::alignment::Alignment> {
            self.0.clone()
        }
    }

    impl ConstraintFactory for NeverCompletes {
        fn make(&self) -> Box<dyn Constraint> {
            Box::new(Self::default())
        }
    }

    #[test]
    fn best_state_only_taken_after_completing_steps() {
        let matches = set(&[("a", "x", 0.9), ("b", "y", 0.4)]);
        let initial = set(&[("c", "z", 1.0)]);
        let out = Greedy::new(NeverCompletes::default())
            .align_with(matches, &initial, &NoopListener)
            .unwrap();
        assert_eq!(out, initial);
    }

    #[test]
    fn non_finite_scores_are_ignored() {
        let matches = set(&[("a", "x", f64::NAN), ("b", "y", 0.4)]);
        let out = Greedy::new(ThresholdConstraint::default()).align(matches).unwrap();
        assert_eq!(out.into_vec(), vec![al("b", "y", 0.4)]);
    }

    #[test]
    fn raising_threshold_never_raises_score() {
        let matches = set(&[("a", "x", 0.9), ("a", "y", 0.6), ("b", "y", 0.5), ("c", "z", 0.2)]);
        let mut last = f64::INFINITY;
        for t in [0.0, 0.3, 0.55, 0.95] {
            let out = Greedy::new(Bijective::default())
                .with_threshold(t)
                .align(matches.clone())
                .unwrap();
            let score = total(&out);
            assert!(score <= last + 1e-12);
            last = score;
        }
    }
}
