//! Scored alignments between two entities.
//!
//! An `Alignment` is the currency shared by every matcher: one candidate
//! link `entity1 --relation--> entity2` with the probability the scorer
//! assigned to it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;
use crate::error::ValidationError;

/// SKOS exact match, the default relation.
pub const SKOS_EXACT_MATCH: &str = "http://www.w3.org/2004/02/skos/core#exactMatch";
/// SKOS broad match.
pub const SKOS_BROAD_MATCH: &str = "http://www.w3.org/2004/02/skos/core#broadMatch";
/// SKOS narrow match.
pub const SKOS_NARROW_MATCH: &str = "http://www.w3.org/2004/02/skos/core#narrowMatch";
/// SKOS related match.
pub const SKOS_RELATED_MATCH: &str = "http://www.w3.org/2004/02/skos/core#relatedMatch";

/// Evaluation mark attached to an alignment.
///
/// Only downstream evaluation reads this; matchers ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    /// Confirmed correct.
    Yes,
    /// Confirmed incorrect.
    No,
    /// Not yet judged.
    #[default]
    Unknown,
    /// Produced by the system but absent from the gold standard.
    Novel,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
            Self::Unknown => write!(f, "unknown"),
            Self::Novel => write!(f, "novel"),
        }
    }
}

/// A scored link between two entities.
///
/// Two alignments are equal iff `entity1`, `entity2` and `score` match
/// exactly (the score is compared bitwise). The relation, features and
/// validity mark do not take part in equality.
///
/// # Examples
///
/// ```
/// use entalign::{Alignment, EntityRef, SKOS_EXACT_MATCH};
///
/// let a = Alignment::new(
///     EntityRef::new("a", "left").unwrap(),
///     EntityRef::new("x", "right").unwrap(),
///     0.9,
/// );
/// assert_eq!(a.relation, SKOS_EXACT_MATCH);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alignment {
    /// Entity from the left dataset.
    pub entity1: EntityRef,
    /// Entity from the right dataset.
    pub entity2: EntityRef,
    /// The relation asserted between the two entities.
    pub relation: String,
    /// Probability that the link holds.
    pub score: f64,
    /// Named feature contributions, if the scorer reported them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, f64>,
    /// Evaluation mark.
    #[serde(default)]
    pub validity: Validity,
}

impl Alignment {
    /// Creates an alignment with the default relation (`skos:exactMatch`).
    ///
    /// The score is not range-checked; use [`Alignment::try_new`] for
    /// untrusted input.
    #[must_use]
    pub fn new(entity1: EntityRef, entity2: EntityRef, score: f64) -> Self {
        Self {
            entity1,
            entity2,
            relation: SKOS_EXACT_MATCH.to_string(),
            score,
            features: BTreeMap::new(),
            validity: Validity::Unknown,
        }
    }

    /// Creates an alignment, rejecting scores outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ScoreOutOfRange` for non-finite or
    /// out-of-range scores.
    pub fn try_new(
        entity1: EntityRef,
        entity2: EntityRef,
        score: f64,
        relation: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(ValidationError::ScoreOutOfRange { value: score });
        }
        Ok(Self::new(entity1, entity2, score).with_relation(relation))
    }

    /// Creates a builder for an alignment.
    #[must_use]
    pub fn builder() -> AlignmentBuilder {
        AlignmentBuilder::new()
    }

    /// Sets the relation.
    #[must_use]
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }

    /// Sets the feature contributions.
    #[must_use]
    pub fn with_features(mut self, features: BTreeMap<String, f64>) -> Self {
        self.features = features;
        self
    }

    /// Sets the validity mark.
    #[must_use]
    pub const fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    /// Returns a copy with a different score, keeping everything else.
    #[must_use]
    pub fn rescored(&self, score: f64) -> Self {
        let mut a = self.clone();
        a.score = score;
        a
    }

    /// Canonical ordering: descending by score, then ascending by the string
    /// forms of entity1 and entity2, then by relation.
    ///
    /// Greedy, beam search and tree search all visit candidates in this order.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.entity1.uri().cmp(other.entity1.uri()))
            .then_with(|| self.entity2.uri().cmp(other.entity2.uri()))
            .then_with(|| self.relation.cmp(&other.relation))
    }
}

/// Builder for [`Alignment`].
#[derive(Debug, Default)]
pub struct AlignmentBuilder {
    entity1: Option<EntityRef>,
    entity2: Option<EntityRef>,
    relation: Option<String>,
    score: Option<f64>,
    features: BTreeMap<String, f64>,
    validity: Validity,
}

impl AlignmentBuilder {
    /// Creates a new alignment builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the left entity.
    #[must_use]
    pub fn entity1(mut self, entity: EntityRef) -> Self {
        self.entity1 = Some(entity);
        self
    }

    /// Sets the right entity.
    #[must_use]
    pub fn entity2(mut self, entity: EntityRef) -> Self {
        self.entity2 = Some(entity);
        self
    }

    /// Sets the relation (defaults to `skos:exactMatch`).
    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Sets the score.
    #[must_use]
    pub const fn score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Adds one named feature contribution.
    #[must_use]
    pub fn feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    /// Sets the validity mark.
    #[must_use]
    pub const fn validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    /// Builds the alignment.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` if an entity or the score is
    /// unset, and `ValidationError::ScoreOutOfRange` if the score is outside
    /// `[0, 1]`.
    pub fn build(self) -> Result<Alignment, ValidationError> {
        let entity1 = self.entity1.ok_or(ValidationError::MissingField {
            field: "entity1".to_string(),
        })?;
        let entity2 = self.entity2.ok_or(ValidationError::MissingField {
            field: "entity2".to_string(),
        })?;
        let score = self.score.ok_or(ValidationError::MissingField {
            field: "score".to_string(),
        })?;
        let relation = self.relation.unwrap_or_else(|| SKOS_EXACT_MATCH.to_string());

        Ok(Alignment::try_new(entity1, entity2, score, relation)?
            .with_features(self.features)
            .with_validity(self.validity))
    }
}

impl PartialEq for Alignment {
    fn eq(&self, other: &Self) -> bool {
        self.entity1 == other.entity1
            && self.entity2 == other.entity2
            && self.score.to_bits() == other.score.to_bits()
    }
}

impl Eq for Alignment {}

impl Hash for Alignment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity1.hash(state);
        self.entity2.hash(state);
        self.score.to_bits().hash(state);
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --{}--> {} ({:.4})",
            self.entity1, self.relation, self.entity2, self.score
        )
    }
}
