//! Ordered collections of alignments.
//!
//! `AlignmentSet` keeps alignments in insertion order and maintains an
//! explicit [`AlignmentIndex`] keyed by `(relation, entity1, entity2)`.
//! Appends update the index incrementally; removals and reorderings rebuild
//! it, so lookups always reflect the current contents.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;
use crate::entity::EntityRef;

/// Lookup index from `(relation, entity1, entity2)` to a position in the set.
///
/// When the same key occurs more than once the last occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct AlignmentIndex {
    by_relation: HashMap<String, HashMap<(EntityRef, EntityRef), usize>>,
}

impl AlignmentIndex {
    /// Builds an index over a slice of alignments.
    #[must_use]
    pub fn build(alignments: &[Alignment]) -> Self {
        let mut index = Self::default();
        for (pos, alignment) in alignments.iter().enumerate() {
            index.insert(alignment, pos);
        }
        index
    }

    fn insert(&mut self, alignment: &Alignment, pos: usize) {
        self.by_relation
            .entry(alignment.relation.clone())
            .or_default()
            .insert((alignment.entity1.clone(), alignment.entity2.clone()), pos);
    }

    /// Position of the alignment with this key, if present.
    #[must_use]
    pub fn position(&self, entity1: &EntityRef, entity2: &EntityRef, relation: &str) -> Option<usize> {
        self.by_relation
            .get(relation)?
            .get(&(entity1.clone(), entity2.clone()))
            .copied()
    }

    /// Position of any alignment between the two entities, whatever its relation.
    ///
    /// Relations are probed in sorted order so the answer is deterministic.
    #[must_use]
    pub fn any_position(&self, entity1: &EntityRef, entity2: &EntityRef) -> Option<usize> {
        let key = (entity1.clone(), entity2.clone());
        let mut relations: Vec<&String> = self.by_relation.keys().collect();
        relations.sort();
        relations
            .into_iter()
            .find_map(|rel| self.by_relation.get(rel).and_then(|m| m.get(&key)).copied())
    }
}

/// An ordered, indexable collection of alignments.
///
/// # Examples
///
/// ```
/// use entalign::{Alignment, AlignmentSet, EntityRef, SKOS_EXACT_MATCH};
///
/// let a = EntityRef::new("a", "left").unwrap();
/// let x = EntityRef::new("x", "right").unwrap();
/// let mut set = AlignmentSet::new();
/// set.push(Alignment::new(a.clone(), x.clone(), 0.8));
/// assert!(set.find(&a, &x, SKOS_EXACT_MATCH).is_some());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Alignment>", into = "Vec<Alignment>")]
pub struct AlignmentSet {
    alignments: Vec<Alignment>,
    index: AlignmentIndex,
}

impl AlignmentSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from a list of alignments, keeping their order.
    #[must_use]
    pub fn from_vec(alignments: Vec<Alignment>) -> Self {
        let index = AlignmentIndex::build(&alignments);
        Self { alignments, index }
    }

    /// Number of alignments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alignments.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alignments.is_empty()
    }

    /// The alignment at position `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Alignment> {
        self.alignments.get(i)
    }

    /// All alignments in their current order.
    #[must_use]
    pub fn alignments(&self) -> &[Alignment] {
        &self.alignments
    }

    /// Iterates in insertion (or last sorted) order.
    pub fn iter(&self) -> std::slice::Iter<'_, Alignment> {
        self.alignments.iter()
    }

    /// The current lookup index.
    #[must_use]
    pub const fn index(&self) -> &AlignmentIndex {
        &self.index
    }

    /// Appends an alignment.
    pub fn push(&mut self, alignment: Alignment) {
        self.index.insert(&alignment, self.alignments.len());
        self.alignments.push(alignment);
    }

    /// Removes every alignment equal to `alignment`. Returns true if any was removed.
    pub fn remove(&mut self, alignment: &Alignment) -> bool {
        let before = self.alignments.len();
        self.retain(|a| a != alignment);
        self.alignments.len() != before
    }

    /// Keeps only the alignments for which `keep` returns true.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Alignment) -> bool,
    {
        self.alignments.retain(keep);
        self.rebuild_index();
    }

    /// Looks up the alignment with this `(entity1, entity2, relation)` key.
    #[must_use]
    pub fn find(&self, entity1: &EntityRef, entity2: &EntityRef, relation: &str) -> Option<&Alignment> {
        self.index
            .position(entity1, entity2, relation)
            .and_then(|pos| self.alignments.get(pos))
    }

    /// Returns true if an alignment with the same key as `alignment` is present.
    #[must_use]
    pub fn contains(&self, alignment: &Alignment) -> bool {
        self.find(&alignment.entity1, &alignment.entity2, &alignment.relation)
            .is_some()
    }

    /// Returns true if any relation links the two entities.
    #[must_use]
    pub fn has_link(&self, entity1: &EntityRef, entity2: &EntityRef) -> bool {
        self.index.any_position(entity1, entity2).is_some()
    }

    /// The relation of a link between the two entities, if there is one.
    #[must_use]
    pub fn find_link(&self, entity1: &EntityRef, entity2: &EntityRef) -> Option<&str> {
        self.index
            .any_position(entity1, entity2)
            .and_then(|pos| self.alignments.get(pos))
            .map(|a| a.relation.as_str())
    }

    /// Distinct relations in first-seen order.
    #[must_use]
    pub fn relations(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for a in &self.alignments {
            if !seen.iter().any(|r| r == &a.relation) {
                seen.push(a.relation.clone());
            }
        }
        seen
    }

    /// Sorts into canonical order: descending score, then entity1, entity2
    /// and relation ascending. See [`Alignment::canonical_cmp`].
    pub fn sort_alignments(&mut self) {
        self.alignments.sort_by(Alignment::canonical_cmp);
        self.rebuild_index();
    }

    /// Consumes the set, returning the alignments.
    #[must_use]
    pub fn into_vec(self) -> Vec<Alignment> {
        self.alignments
    }

    fn rebuild_index(&mut self) {
        self.index = AlignmentIndex::build(&self.alignments);
    }
}

impl PartialEq for AlignmentSet {
    fn eq(&self, other: &Self) -> bool {
        self.alignments == other.alignments
    }
}

impl From<Vec<Alignment>> for AlignmentSet {
    fn from(alignments: Vec<Alignment>) -> Self {
        Self::from_vec(alignments)
    }
}

impl From<AlignmentSet> for Vec<Alignment> {
    fn from(set: AlignmentSet) -> Self {
        set.alignments
    }
}

impl FromIterator<Alignment> for AlignmentSet {
    fn from_iter<I: IntoIterator<Item = Alignment>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl Extend<Alignment> for AlignmentSet {
    fn extend<I: IntoIterator<Item = Alignment>>(&mut self, iter: I) {
        for alignment in iter {
            self.push(alignment);
        }
    }
}

impl IntoIterator for AlignmentSet {
    type Item = Alignment;
    type IntoIter = std::vec::IntoIter<Alignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.alignments.into_iter()
    }
}

impl<'a> IntoIterator for &'a AlignmentSet {
    type Item = &'a Alignment;
    type IntoIter = std::slice::Iter<'a, Alignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.alignments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{SKOS_BROAD_MATCH, SKOS_EXACT_MATCH};

    fn e(uri: &str) -> EntityRef {
        EntityRef::new(uri, "dataset").unwrap()
    }

    fn al(l: &str, r: &str, score: f64) -> Alignment {
        Alignment::new(e(l), e(r), score)
    }

    #[test]
    fn find_tracks_pushes_and_removals() {
        let mut set = AlignmentSet::new();
        set.push(al("a", "x", 0.5));
        set.push(al("b", "y", 0.7));
        assert!(set.find(&e("b"), &e("y"), SKOS_EXACT_MATCH).is_some());

        assert!(set.remove(&al("a", "x", 0.5)));
        assert!(set.find(&e("a"), &e("x"), SKOS_EXACT_MATCH).is_none());
        // Positions shift after removal; the index must follow.
        let found = set.find(&e("b"), &e("y"), SKOS_EXACT_MATCH).unwrap();
        assert_eq!(found, &al("b", "y", 0.7));
    }

    #[test]
    fn find_is_keyed_by_relation() {
        let set: AlignmentSet = vec![al("a", "x", 0.5).with_relation(SKOS_BROAD_MATCH)]
            .into_iter()
            .collect();
        assert!(set.find(&e("a"), &e("x"), SKOS_EXACT_MATCH).is_none());
        assert!(set.find(&e("a"), &e("x"), SKOS_BROAD_MATCH).is_some());
        assert!(set.has_link(&e("a"), &e("x")));
        assert_eq!(set.find_link(&e("a"), &e("x")), Some(SKOS_BROAD_MATCH));
        assert!(!set.has_link(&e("x"), &e("a")));
    }

    #[test]
    fn sort_is_canonical() {
        let mut set = AlignmentSet::from_vec(vec![
            al("b", "x", 0.5),
            al("a", "y", 0.5),
            al("c", "z", 0.9),
            al("a", "x", 0.5),
        ]);
        set.sort_alignments();
        let order: Vec<(String, String)> = set
            .iter()
            .map(|a| (a.entity1.to_string(), a.entity2.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("c".to_string(), "z".to_string()),
                ("a".to_string(), "x".to_string()),
                ("a".to_string(), "y".to_string()),
                ("b".to_string(), "x".to_string()),
            ]
        );
        assert!(set.find(&e("a"), &e("y"), SKOS_EXACT_MATCH).is_some());
    }

    #[test]
    fn relations_in_first_seen_order() {
        let set = AlignmentSet::from_vec(vec![
            al("a", "x", 0.5).with_relation("r2"),
            al("b", "y", 0.5).with_relation("r1"),
            al("c", "z", 0.5).with_relation("r2"),
        ]);
        assert_eq!(set.relations(), vec!["r2".to_string(), "r1".to_string()]);
    }

    #[test]
    fn serializes_as_plain_array() {
        let set = AlignmentSet::from_vec(vec![al("a", "x", 0.5)]);
        let json = serde_json::to_value(&set).unwrap();
        assert!(json.is_array());
        let back: AlignmentSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
        assert!(back.contains(&al("a", "x", 0.5)));
    }
}
