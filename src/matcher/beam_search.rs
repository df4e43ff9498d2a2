//! Beam search over partial constraint states.

use std::sync::Arc;

use crate::alignment_set::AlignmentSet;
use crate::constraint::{Constraint, ConstraintFactory};
use crate::error::{AlignResult, MatchError};
use crate::listener::{MatchListener, Stage};
use crate::matcher::{keep_if_better, seed_constraint, Matcher};

/// How often progress is reported, in candidates.
const PROGRESS_INTERVAL: usize = 10_000;

/// A bounded collection of the best-scoring items, highest first.
///
/// Items with equal scores keep their insertion order.
#[derive(Debug, Clone)]
pub struct Beam<T> {
    entries: Vec<(f64, T)>,
    capacity: usize,
}

impl<T> Beam<T> {
    /// An empty beam holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity.min(1024) + 1),
            capacity,
        }
    }

    /// Inserts `item` if there is room or it beats the current minimum.
    /// Returns true if the item was kept.
    pub fn insert(&mut self, item: T, score: f64) -> bool {
        if self.entries.len() >= self.capacity && score <= self.minimum().unwrap_or(f64::NEG_INFINITY) {
            return false;
        }
        let pos = self.entries.partition_point(|(s, _)| *s >= score);
        self.entries.insert(pos, (score, item));
        self.entries.truncate(self.capacity);
        pos < self.capacity
    }

    /// Lowest score in the beam.
    #[must_use]
    pub fn minimum(&self) -> Option<f64> {
        self.entries.last().map(|(s, _)| *s)
    }

    /// Number of items held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the beam holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Items from best to worst.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, item)| item)
    }
}

/// Explores up to `beam_size` partial solutions in parallel.
///
/// States are treated as persistent: every extension copies its parent, so
/// branches never interfere.
#[derive(Debug, Clone)]
pub struct BeamSearch {
    constraint: Arc<dyn ConstraintFactory>,
    threshold: f64,
    beam_size: usize,
    max_iterations: usize,
}

impl BeamSearch {
    /// A beam search with beam size 100, no threshold and no iteration cap.
    #[must_use]
    pub fn new(constraint: impl ConstraintFactory + 'static) -> Self {
        Self::from_factory(Arc::new(constraint))
    }

    /// As [`BeamSearch::new`], over a shared constraint factory.
    #[must_use]
    pub fn from_factory(constraint: Arc<dyn ConstraintFactory>) -> Self {
        Self {
            constraint,
            threshold: f64::NEG_INFINITY,
            beam_size: 100,
            max_iterations: 0,
        }
    }

    /// Sets the minimum candidate score.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets how many states the beam retains. Must be at least 1.
    #[must_use]
    pub const fn with_beam_size(mut self, beam_size: usize) -> Self {
        self.beam_size = beam_size;
        self
    }

    /// Stops after this many candidates; 0 means no limit.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Matcher for BeamSearch {
    fn id(&self) -> &'static str {
        "beam-search"
    }

    fn align_with(
        &self,
        mut matches: AlignmentSet,
        initial: &AlignmentSet,
        listener: &dyn MatchListener,
    ) -> AlignResult<AlignmentSet> {
        matches.sort_alignments();
        let seed = seed_constraint(self.constraint.as_ref(), initial, &matches, listener);
        let mut best: Option<Box<dyn Constraint>> = None;
        keep_if_better(&mut best, seed.as_ref());

        let mut beam: Beam<Box<dyn Constraint>> = Beam::new(self.beam_size.max(1));
        let seed_score = seed.score();
        beam.insert(seed, seed_score);

        for (iter, alignment) in matches.iter().enumerate() {
            if self.max_iterations > 0 && iter >= self.max_iterations {
                tracing::debug!(iter, "beam search stopped at iteration cap");
                break;
            }
            if alignment.score >= self.threshold {
                let extended: Vec<Box<dyn Constraint>> = beam
                    .iter()
                    .filter(|state| state.can_add(alignment))
                    .map(|state| {
                        let mut next = state.copy();
                        next.add(alignment);
                        next
                    })
                    .collect();
                for next in extended {
                    keep_if_better(&mut best, next.as_ref());
                    let score = next.score();
                    beam.insert(next, score);
                }
            }
            if (iter + 1) % PROGRESS_INTERVAL == 0 {
                let best_score = best.as_ref().map_or(0.0, |b| b.score());
                listener.update_status(
                    Stage::Matching,
                    &format!("Generated {}th candidate (max score={best_score:.2})", iter + 1),
                );
            }
        }

        let Some(best) = best else {
            return Err(MatchError::unsolvable(
                self.id(),
                "Beam search did not find any complete solutions",
            )
            .into());
        };
        tracing::info!(
            accepted = best.alignments().len(),
            score = best.score(),
            beam_size = self.beam_size,
            "beam search finished"
        );
        Ok(AlignmentSet::from_vec(best.alignments()))
    }
}
