//! Cardinality caps.
//!
//! Each entity may take part in a bounded number of accepted links, and a
//! solution is only complete once it holds at least `min_alignments` links.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;
use crate::constraint::{Constraint, ConstraintFactory};
use crate::entity::EntityRef;

/// Factory for capacity-bounded constraint states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacity {
    /// Maximum links per left entity.
    pub max_per_entity1: usize,
    /// Maximum links per right entity.
    pub max_per_entity2: usize,
    /// Minimum number of accepted links for a complete solution.
    pub min_alignments: usize,
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            max_per_entity1: 1,
            max_per_entity2: 1,
            min_alignments: 0,
        }
    }
}

impl ConstraintFactory for Capacity {
    fn make(&self) -> Box<dyn Constraint> {
        Box::new(CapacityState {
            limits: *self,
            left_counts: HashMap::new(),
            right_counts: HashMap::new(),
            alignments: Vec::new(),
            score: 0.0,
        })
    }
}

#[derive(Debug, Clone)]
struct CapacityState {
    limits: Capacity,
    left_counts: HashMap<EntityRef, usize>,
    right_counts: HashMap<EntityRef, usize>,
    alignments: Vec<Alignment>,
    score: f64,
}

impl Constraint for CapacityState {
    fn can_add(&self, alignment: &Alignment) -> bool {
        let left = self.left_counts.get(&alignment.entity1).copied().unwrap_or(0);
        let right = self.right_counts.get(&alignment.entity2).copied().unwrap_or(0);
        left < self.limits.max_per_entity1 && right < self.limits.max_per_entity2
    }

    fn add(&mut self, alignment: &Alignment) {
        self.score += self.delta(alignment);
        *self.left_counts.entry(alignment.entity1.clone()).or_insert(0) += 1;
        *self.right_counts.entry(alignment.entity2.clone()).or_insert(0) += 1;
        self.alignments.push(alignment.clone());
    }

    fn complete(&self) -> bool {
        self.alignments.len() >= self.limits.min_alignments
    }

    fn can_complete(&self, _alignment: &Alignment) -> bool {
        self.alignments.len() + 1 >= self.limits.min_alignments
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::test_support::al;

    #[test]
    fn caps_links_per_entity() {
        let mut c = Capacity {
            max_per_entity1: 2,
            max_per_entity2: 1,
            min_alignments: 0,
        }
        .make();
        c.add(&al("a", "x", 0.9));
        assert!(c.can_add(&al("a", "y", 0.5)));
        c.add(&al("a", "y", 0.5));
        assert!(!c.can_add(&al("a", "z", 0.5)));
        assert!(!c.can_add(&al("b", "x", 0.5)));
    }

    #[test]
    fn complete_needs_minimum_size() {
        let mut c = Capacity {
            min_alignments: 2,
            ..Capacity::default()
        }
        .make();
        assert!(!c.complete());
        assert!(!c.can_complete(&al("a", "x", 0.9)));
        c.add(&al("a", "x", 0.9));
        assert!(!c.complete());
        assert!(c.can_complete(&al("b", "y", 0.5)));
        c.add(&al("b", "y", 0.5));
        assert!(c.complete());
    }
}
