//! Pre-scoring resolution of unambiguous pairs.

use std::collections::{HashMap, HashSet};

use crate::alignment::Alignment;
use crate::alignment_set::AlignmentSet;
use crate::entity::{CandidatePair, EntityRef};

/// Pairs entities that occur in exactly one candidate pair.
///
/// Any entity seen in a second pair is burnt: both sides of that pair, and
/// the partner of any earlier tentative pairing, are excluded for good. The
/// surviving pairings become exact-match alignments with score 1.0, in the
/// order they were first seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prematcher;

impl Prematcher {
    /// Creates a prematcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves the unambiguous pairs of `pairs`.
    pub fn prematch<I>(&self, pairs: I) -> AlignmentSet
    where
        I: IntoIterator<Item = CandidatePair>,
    {
        let mut l2r: HashMap<EntityRef, EntityRef> = HashMap::new();
        let mut r2l: HashMap<EntityRef, EntityRef> = HashMap::new();
        let mut burnt_left: HashSet<EntityRef> = HashSet::new();
        let mut burnt_right: HashSet<EntityRef> = HashSet::new();
        let mut order: Vec<EntityRef> = Vec::new();
        let mut seen = 0usize;

        for pair in pairs {
            seen += 1;
            let CandidatePair { entity1, entity2 } = pair;
            let clash = l2r.contains_key(&entity1)
                || r2l.contains_key(&entity2)
                || burnt_left.contains(&entity1)
                || burnt_right.contains(&entity2);
            if clash {
                if let Some(right) = l2r.remove(&entity1) {
                    r2l.remove(&right);
                    burnt_right.insert(right);
                }
                if let Some(left) = r2l.remove(&entity2) {
                    l2r.remove(&left);
                    burnt_left.insert(left);
                }
                burnt_left.insert(entity1);
                burnt_right.insert(entity2);
            } else {
                order.push(entity1.clone());
                l2r.insert(entity1.clone(), entity2.clone());
                r2l.insert(entity2, entity1);
            }
        }

        let prematched: AlignmentSet = order
            .into_iter()
            .filter_map(|left| {
                let right = l2r.get(&left)?.clone();
                Some(Alignment::new(left, right, 1.0))
            })
            .collect();
        tracing::debug!(pairs = seen, prematched = prematched.len(), "prematch finished");
        prematched
    }
}
