//! Taxonomic linking over SKOS mapping relations.
//!
//! No entity may be linked by more than one kind of link. Exact links are
//! bijective, broad links are injective on the left, narrow links are
//! injective on the right, and related links only need to agree in kind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alignment::{
    Alignment, SKOS_BROAD_MATCH, SKOS_EXACT_MATCH, SKOS_NARROW_MATCH, SKOS_RELATED_MATCH,
};
use crate::constraint::{Constraint, ConstraintFactory};
use crate::entity::EntityRef;

/// Factory for taxonomic constraint states. Each field names the relation
/// URI playing that role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Taxonomic {
    pub exact_match: String,
    pub broad_match: String,
    pub narrow_match: String,
    pub related_match: String,
}

impl Default for Taxonomic {
    fn default() -> Self {
        Self {
            exact_match: SKOS_EXACT_MATCH.to_string(),
            broad_match: SKOS_BROAD_MATCH.to_string(),
            narrow_match: SKOS_NARROW_MATCH.to_string(),
            related_match: SKOS_RELATED_MATCH.to_string(),
        }
    }
}

impl ConstraintFactory for Taxonomic {
    fn make(&self) -> Box<dyn Constraint> {
        Box::new(TaxonomicState {
            relations: self.clone(),
            by_left: HashMap::new(),
            by_right: HashMap::new(),
            alignments: Vec::new(),
            score: 0.0,
        })
    }
}

#[derive(Debug, Clone)]
struct TaxonomicState {
    relations: Taxonomic,
    by_left: HashMap<EntityRef, Vec<String>>,
    by_right: HashMap<EntityRef, Vec<String>>,
    alignments: Vec<Alignment>,
    score: f64,
}

impl TaxonomicState {
    fn left_only(&self, entity: &EntityRef, relation: &str) -> bool {
        self.by_left
            .get(entity)
            .map_or(true, |rels| rels.iter().all(|r| r == relation))
    }

    fn right_only(&self, entity: &EntityRef, relation: &str) -> bool {
        self.by_right
            .get(entity)
            .map_or(true, |rels| rels.iter().all(|r| r == relation))
    }
}

impl Constraint for TaxonomicState {
    fn can_add(&self, alignment: &Alignment) -> bool {
        let rel = alignment.relation.as_str();
        let left_free = !self.by_left.contains_key(&alignment.entity1);
        let right_free = !self.by_right.contains_key(&alignment.entity2);

        if rel == self.relations.exact_match {
            left_free && right_free
        } else if rel == self.relations.broad_match {
            left_free && self.right_only(&alignment.entity2, rel)
        } else if rel == self.relations.narrow_match {
            right_free && self.left_only(&alignment.entity1, rel)
        } else if rel == self.relations.related_match {
            self.left_only(&alignment.entity1, rel) && self.right_only(&alignment.entity2, rel)
        } else {
            tracing::debug!(relation = rel, "relation not supported by taxonomic linking");
            false
        }
    }

    fn supports(&self, relation: &str) -> bool {
        [
            &self.relations.exact_match,
            &self.relations.broad_match,
            &self.relations.narrow_match,
            &self.relations.related_match,
        ]
        .iter()
        .any(|r| r.as_str() == relation)
    }

    fn add(&mut self, alignment: &Alignment) {
        self.score += self.delta(alignment);
        self.by_left
            .entry(alignment.entity1.clone())
            .or_default()
            .push(alignment.relation.clone());
        self.by_right
            .entry(alignment.entity2.clone())
            .or_default()
            .push(alignment.relation.clone());
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
