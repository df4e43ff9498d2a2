//! Entity references.
//!
//! Entities are opaque to the matching core: an `EntityRef` is just a URI
//! tagged with the dataset it was read from. Two references are the same
//! entity only if both the URI and the dataset agree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A reference to an entity in one of the two datasets being aligned.
///
/// # Examples
///
/// ```
/// use entalign::EntityRef;
///
/// let e = EntityRef::new("http://example.org/a", "left").unwrap();
/// assert_eq!(e.uri(), "http://example.org/a");
/// assert_eq!(e.to_string(), "http://example.org/a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    uri: String,
    dataset: String,
}

impl EntityRef {
    /// Creates a validated entity reference.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyEntityUri` or `ValidationError::EmptyDataset`
    /// if either part is empty.
    pub fn new(uri: impl Into<String>, dataset: impl Into<String>) -> Result<Self, ValidationError> {
        let uri = uri.into();
        let dataset = dataset.into();
        if uri.trim().is_empty() {
            return Err(ValidationError::EmptyEntityUri);
        }
        if dataset.trim().is_empty() {
            return Err(ValidationError::EmptyDataset);
        }
        Ok(Self { uri, dataset })
    }

    /// Returns the entity URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the dataset tag.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }
}

/// The string form is the URI alone; the canonical alignment sort uses it.
impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// A raw candidate pair produced by blocking, before any scoring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    /// Entity from the left dataset.
    pub entity1: EntityRef,
    /// Entity from the right dataset.
    pub entity2: EntityRef,
}

impl CandidatePair {
    /// Creates a candidate pair.
    #[must_use]
    pub const fn new(entity1: EntityRef, entity2: EntityRef) -> Self {
        Self { entity1, entity2 }
    }
}
