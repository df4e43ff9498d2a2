//! Pluggable constraints over partial solutions.
//!
//! A [`Constraint`] is an incremental search state: it knows which
//! alignments have been accepted, whether another one may legally be added,
//! whether the accepted set is a complete solution, and its cumulative
//! score. Matchers are written against this trait only and never know which
//! concrete policy is active.
//!
//! `add` mutates in place. Matchers that branch from one state (beam search,
//! tree search) call [`Constraint::copy`] first and treat states as
//! persistent from then on.

pub mod bijective;
pub mod capacity;
pub mod taxonomic;
pub mod threshold;

pub use bijective::{Bijective, Surjection};
pub use capacity::Capacity;
pub use taxonomic::Taxonomic;
pub use threshold::ThresholdConstraint;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;

/// Smoothing term in the log-probability score.
pub const EPS: f64 = 1e-10;

/// Score gained by accepting an alignment with probability `p`:
/// `ln(p + 1 + EPS)`. Strictly positive for any `p >= 0`.
#[must_use]
pub fn log_delta(p: f64) -> f64 {
    (p + 1.0 + EPS).ln()
}

/// An incremental, copyable search state over accepted alignments.
///
/// # Invariants
///
/// When alignments are offered in a fixed order, legality of the next one
/// depends only on what has been accepted so far.
pub trait Constraint: fmt::Debug {
    /// Whether accepting `alignment` keeps the state legal.
    fn can_add(&self, alignment: &Alignment) -> bool;

    /// Accepts `alignment`. Callers check [`Constraint::can_add`] first,
    /// except when forcing an authoritative partial solution.
    fn add(&mut self, alignment: &Alignment);

    /// Whether the accepted set is a complete solution.
    fn complete(&self) -> bool {
        true
    }

    /// Whether accepting `alignment` would leave the state complete.
    fn can_complete(&self, _alignment: &Alignment) -> bool {
        true
    }

    /// Whether links with this relation can ever be accepted.
    fn supports(&self, _relation: &str) -> bool {
        true
    }

    /// Cumulative score of the accepted alignments.
    fn score(&self) -> f64;

    /// Score change if `alignment` were accepted.
    fn delta(&self, alignment: &Alignment) -> f64 {
        log_delta(alignment.score)
    }

    /// Independent deep copy of this state.
    fn copy(&self) -> Box<dyn Constraint>;

    /// The accepted alignments, in acceptance order.
    fn alignments(&self) -> Vec<Alignment>;
}

/// Creates empty constraint states.
pub trait ConstraintFactory: fmt::Debug + Send + Sync {
    /// A fresh state with nothing accepted.
    fn make(&self) -> Box<dyn Constraint>;
}

/// Built-in constraints, selected by `name` in configuration.
///
/// ```
/// use entalign::ConstraintConfig;
///
/// let c: ConstraintConfig = serde_json::from_str(r#"{"name": "bijective"}"#).unwrap();
/// assert_eq!(c.id(), "bijective");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ConstraintConfig {
    /// One-to-one, or one-to-many in one direction.
    Bijective(Bijective),
    /// Accept anything at or above a threshold.
    Threshold(ThresholdConstraint),
    /// SKOS exact/broad/narrow/related linking rules.
    Taxonomic(Taxonomic),
    /// Per-entity caps with a minimum solution size.
    Capacity(Capacity),
}

impl ConstraintConfig {
    /// The configuration name of this constraint.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Bijective(_) => "bijective",
            Self::Threshold(_) => "threshold",
            Self::Taxonomic(_) => "taxonomic",
            Self::Capacity(_) => "capacity",
        }
    }
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self::Bijective(Bijective::default())
    }
}

impl ConstraintFactory for ConstraintConfig {
    fn make(&self) -> Box<dyn Constraint> {
        match self {
            Self::Bijective(c) => c.make(),
            Self::Threshold(c) => c.make(),
            Self::Taxonomic(c) => c.make(),
            Self::Capacity(c) => c.make(),
        }
    }
}
