//! One-to-one linking.
//!
//! No entity may be linked more than once on a constrained side. Note that a
//! plain bijective constraint is solved exactly, and much faster, by the
//! unique assignment matcher.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;
use crate::constraint::{Constraint, ConstraintFactory};
use crate::entity::EntityRef;

/// Which sides of the link are restricted to a single use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surjection {
    /// Many left entities may link to the same right entity.
    Surjective,
    /// Many right entities may link to the same left entity.
    InverseSurjective,
    /// No entity on either side may be linked twice.
    #[default]
    Bijective,
}

impl Surjection {
    const fn restricts_left(self) -> bool {
        !matches!(self, Self::InverseSurjective)
    }

    const fn restricts_right(self) -> bool {
        !matches!(self, Self::Surjective)
    }
}

/// Factory for bijective constraint states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Bijective {
    /// Which sides are restricted.
    pub surjection: Surjection,
}

impl Bijective {
    /// A factory with the given restriction.
    #[must_use]
    pub const fn new(surjection: Surjection) -> Self {
        Self { surjection }
    }
}

impl ConstraintFactory for Bijective {
    fn make(&self) -> Box<dyn Constraint> {
        Box::new(BijectiveState {
            surjection: self.surjection,
            used_left: HashSet::new(),
            used_right: HashSet::new(),
            alignments: Vec::new(),
            score: 0.0,
        })
    }
}

#[derive(Debug, Clone)]
struct BijectiveState {
    surjection: Surjection,
    used_left: HashSet<EntityRef>,
    used_right: HashSet<EntityRef>,
    alignments: Vec<Alignment>,
    score: f64,
}

impl Constraint for BijectiveState {
    fn can_add(&self, alignment: &Alignment) -> bool {
        (!self.surjection.restricts_left() || !self.used_left.contains(&alignment.entity1))
            && (!self.surjection.restricts_right() || !self.used_right.contains(&alignment.entity2))
    }

    fn add(&mut self, alignment: &Alignment) {
        self.score += self.delta(alignment);
        if self.surjection.restricts_left() {
            self.used_left.insert(alignment.entity1.clone());
        }
        if self.surjection.restricts_right() {
            self.used_right.insert(alignment.entity2.clone());
        }
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
