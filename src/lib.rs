//! # entalign - Constraint-Aware Entity Alignment
//!
//! entalign selects the final links between the entities of two datasets.
//! Upstream stages produce scored candidate pairs; a matcher picks the subset
//! that maximizes total score while satisfying a structural constraint, and
//! optionally preserves a fixed partial solution.
//!
//! ## Core Concepts
//!
//! - **Alignment**: a scored link between two entities under a relation
//! - **AlignmentSet**: an ordered, indexed collection of alignments with a canonical sort
//! - **Constraint**: an incremental search state deciding which links may be added
//! - **Matcher**: a solver (threshold, greedy, beam search, tree search, exact assignment)
//!
//! ## Usage
//!
//! ```rust
//! use entalign::{Alignment, AlignmentSet, EntityRef, Matcher, MatcherConfig};
//!
//! let e = |uri: &str| EntityRef::new(uri, "kb").unwrap();
//! let candidates: AlignmentSet = vec![
//!     Alignment::new(e("a"), e("x"), 0.9),
//!     Alignment::new(e("a"), e("y"), 0.85),
//!     Alignment::new(e("b"), e("x"), 0.8),
//!     Alignment::new(e("b"), e("y"), 0.1),
//! ]
//! .into();
//!
//! let matcher = MatcherConfig::from_json(r#"{"name": "unique"}"#)?.build()?;
//! let chosen = matcher.align(candidates)?;
//! assert_eq!(chosen.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod alignment;
pub mod alignment_set;
pub mod entity;
pub mod error;
pub mod listener;

// Search
pub mod config;
pub mod constraint;
pub mod matcher;

// Re-export primary types at crate root for convenience
pub use alignment::{
    Alignment, AlignmentBuilder, Validity, SKOS_BROAD_MATCH, SKOS_EXACT_MATCH, SKOS_NARROW_MATCH,
    SKOS_RELATED_MATCH,
};
pub use alignment_set::{AlignmentIndex, AlignmentSet};
pub use config::{BeamSearchConfig, GreedyConfig, MatcherConfig, MonteCarloConfig};
pub use constraint::{
    Bijective, Capacity, Constraint, ConstraintConfig, ConstraintFactory, Surjection, Taxonomic,
    ThresholdConstraint,
};
pub use entity::{CandidatePair, EntityRef};
pub use error::{AlignError, AlignResult, MatchError, ValidationError};
pub use listener::{
    Level, MatchListener, NoopListener, RecordingListener, Stage, StatusMessage, TracingListener,
};
pub use matcher::{
    Beam, BeamSearch, Greedy, Matcher, MonteCarloTreeSearch, Prematcher, Threshold,
    UniqueAssignment,
};
