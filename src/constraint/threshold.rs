//! Accept-everything-above-a-threshold constraint.

use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;
use crate::constraint::{Constraint, ConstraintFactory};

/// Accepts any alignment whose score is at least `threshold`.
///
/// With the default threshold (negative infinity) it accepts every
/// alignment, which makes it the "no constraint" policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConstraint {
    /// Minimum score to accept.
    #[serde(skip_serializing_if = "crate::config::is_unbounded")]
    pub threshold: f64,
}

impl Default for ThresholdConstraint {
    fn default() -> Self {
        Self {
            threshold: f64::NEG_INFINITY,
        }
    }
}

impl ThresholdConstraint {
    /// A constraint accepting scores at or above `threshold`.
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl ConstraintFactory for ThresholdConstraint {
    fn make(&self) -> Box<dyn Constraint> {
        Box::new(ThresholdState {
            threshold: self.threshold,
            alignments: Vec::new(),
            score: 0.0,
        })
    }
}

#[derive(Debug, Clone)]
struct ThresholdState {
    threshold: f64,
    alignments: Vec<Alignment>,
    score: f64,
}

impl Constraint for ThresholdState {
    fn can_add(&self, alignment: &Alignment) -> bool {
        alignment.score >= self.threshold
    }

    fn add(&mut self, alignment: &Alignment) {
        self.score += self.delta(alignment);
        self.alignments.push(alignment.clone());
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn copy(&self) -> Box<dyn Constraint> {
        Box::new(self.clone())
    }

    fn alignments(&self) -> Vec<Alignment> {
        self.alignments.clone()
    }
}
