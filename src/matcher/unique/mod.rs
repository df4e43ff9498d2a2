//! Exact one-to-one assignment per relation.
//!
//! For every relation the free entities (those not fixed by the initial
//! alignments) are indexed in candidate order, their scores laid out in a
//! sparse matrix and the maximum-weight assignment found with the
//! Kuhn-Munkres algorithm. Each prime or adjust step scans the stored cells,
//! so a relation costs O(n² · nnz) in the worst case.

mod munkres;
mod sparse;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;
use crate::alignment_set::AlignmentSet;
use crate::entity::EntityRef;
use crate::error::{AlignResult, MatchError};
use crate::listener::{Level, MatchListener, Stage};
use crate::matcher::Matcher;

use munkres::Munkres;
use sparse::SparseMatrix;

/// Maximum-weight bipartite matching, solved exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueAssignment {
    /// Candidates scoring below this are ignored.
    #[serde(skip_serializing_if = "crate::config::is_unbounded")]
    pub threshold: f64,
    /// Score given to an assigned pair that had no candidate of its own.
    pub base_probability: f64,
}

impl Default for UniqueAssignment {
    fn default() -> Self {
        Self {
            threshold: f64::NEG_INFINITY,
            base_probability: 0.1,
        }
    }
}

impl UniqueAssignment {
    /// An assignment matcher with no threshold and base probability 0.1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum candidate score.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the score of synthesized pairs. Must lie in `(0, 1]`.
    #[must_use]
    pub const fn with_base_probability(mut self, base_probability: f64) -> Self {
        self.base_probability = base_probability;
        self
    }

    fn assign_relation(
        &self,
        relation: &str,
        matches: &AlignmentSet,
        initial: &AlignmentSet,
    ) -> AlignResult<Vec<Alignment>> {
        let mut left_fixed: HashSet<&EntityRef> = HashSet::new();
        let mut right_fixed: HashSet<&EntityRef> = HashSet::new();
        for init in initial.iter().filter(|a| a.relation == relation) {
            left_fixed.insert(&init.entity1);
            right_fixed.insert(&init.entity2);
        }

        let mut lefts: Vec<&EntityRef> = Vec::new();
        let mut rights: Vec<&EntityRef> = Vec::new();
        let mut left_index: HashMap<&EntityRef, usize> = HashMap::new();
        let mut right_index: HashMap<&EntityRef, usize> = HashMap::new();
        let mut cells: Vec<(usize, usize, &Alignment)> = Vec::new();

        for alignment in matches.iter().filter(|a| a.relation == relation && a.score >= self.threshold) {
            if alignment.score < 0.0 {
                return Err(MatchError::NegativeScore {
                    entity1: alignment.entity1.to_string(),
                    entity2: alignment.entity2.to_string(),
                    score: alignment.score,
                }
                .into());
            }
            if left_fixed.contains(&alignment.entity1) || right_fixed.contains(&alignment.entity2) {
                continue;
            }
            let i = *left_index.entry(&alignment.entity1).or_insert_with(|| {
                lefts.push(&alignment.entity1);
                lefts.len() - 1
            });
            let j = *right_index.entry(&alignment.entity2).or_insert_with(|| {
                rights.push(&alignment.entity2);
                rights.len() - 1
            });
            cells.push((i, j, alignment));
        }
        if cells.is_empty() {
            return Ok(Vec::new());
        }

        let mut matrix = SparseMatrix::new(lefts.len(), rights.len());
        // The best-scoring candidate of a repeated cell is the one reported.
        let mut originals: HashMap<(usize, usize), &Alignment> = HashMap::new();
        for &(i, j, alignment) in &cells {
            matrix.set(i, j, alignment.score);
            originals
                .entry((i, j))
                .and_modify(|kept| {
                    if alignment.score > kept.score {
                        *kept = alignment;
                    }
                })
                .or_insert(alignment);
        }
        tracing::debug!(
            relation,
            rows = matrix.rows(),
            cols = matrix.cols(),
            cells = matrix.nnz(),
            "solving assignment"
        );

        let assignment = Munkres::new(&matrix).solve(relation)?;
        let chosen = assignment
            .into_iter()
            .filter(|&(i, j)| i < lefts.len() && j < rights.len())
            .map(|(i, j)| match originals.get(&(i, j)) {
                Some(original) => (*original).clone(),
                None => Alignment::new(lefts[i].clone(), rights[j].clone(), self.base_probability)
                    .with_relation(relation),
            })
            .collect();
        Ok(chosen)
    }
}

impl Matcher for UniqueAssignment {
    fn id(&self) -> &'static str {
        "unique"
    }

    fn align_with(
        &self,
        matches: AlignmentSet,
        initial: &AlignmentSet,
        listener: &dyn MatchListener,
    ) -> AlignResult<AlignmentSet> {
        if matches.is_empty() {
            listener.update_status(Stage::Matching, "No alignments generated");
        }
        let mut result = AlignmentSet::new();
        for relation in matches.relations() {
            match self.assign_relation(&relation, &matches, initial) {
                Ok(chosen) => result.extend(chosen),
                Err(err) => {
                    listener.message(Stage::Matching, Level::Critical, &err.to_string());
                    return Err(err);
                }
            }
        }
        result.extend(initial.iter().cloned());
        tracing::info!(
            accepted = result.len(),
            candidates = matches.len(),
            "unique assignment finished"
        );
        Ok(result)
    }
}
