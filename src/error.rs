//! Error types for entalign.
//!
//! All errors are strongly typed using thiserror so callers can tell a bad
//! configuration apart from a constraint that has no complete solution, or
//! from a solver that ran away.

use thiserror::Error;

/// Validation errors raised while building inputs or configuring a matcher.
///
/// These surface before any search begins and are never retryable as-is.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid parameter: {name} - {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Entity URI cannot be empty")]
    EmptyEntityUri,

    #[error("Entity dataset cannot be empty")]
    EmptyDataset,

    #[error("Alignment score {value} is out of range [0.0, 1.0]")]
    ScoreOutOfRange {
        value: f64,
    },
}

/// Errors that occur while a matcher is running.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Unsolvable constraint in {matcher}: {reason}")]
    Unsolvable {
        matcher: String,
        reason: String,
    },

    #[error("Invalid (negative) alignment score {score} between {entity1} and {entity2}")]
    NegativeScore {
        entity1: String,
        entity2: String,
        score: f64,
    },

    /// The assignment solver exceeded its step cap. `snapshot` carries the
    /// solver state as JSON for postmortem analysis.
    #[error("Assignment for relation '{relation}' exceeded {limit} iterations")]
    IterationLimitExceeded {
        relation: String,
        limit: usize,
        snapshot: String,
    },
}

impl MatchError {
    /// Creates an unsolvable-constraint error for the named matcher.
    #[must_use]
    pub fn unsolvable(matcher: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsolvable {
            matcher: matcher.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for entalign.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Matching error: {0}")]
    Matching(#[from] MatchError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl AlignError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the matcher found no complete solution.
    #[must_use]
    pub const fn is_unsolvable(&self) -> bool {
        matches!(self, Self::Matching(MatchError::Unsolvable { .. }))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the caller may retry, typically after relaxing the
    /// threshold or constraint.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false, // Configuration won't change on retry
            Self::Matching(e) => matches!(e, MatchError::Unsolvable { .. }),
            Self::Internal { .. } => false,
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for entalign operations.
pub type AlignResult<T> = Result<T, AlignError>;
