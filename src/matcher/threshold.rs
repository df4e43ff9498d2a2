//! Plain score cut-off.

use serde::{Deserialize, Serialize};

use crate::alignment_set::AlignmentSet;
use crate::error::AlignResult;
use crate::listener::MatchListener;
use crate::matcher::Matcher;

/// Keeps every alignment, candidate or initial, scoring at least `threshold`.
///
/// No constraint is consulted and the call always succeeds, even with an
/// empty result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Threshold {
    /// Minimum score kept.
    pub threshold: f64,
}

impl Default for Threshold {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Threshold {
    /// A filter at `threshold`.
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Matcher for Threshold {
    fn id(&self) -> &'static str {
        "threshold"
    }

    fn align_with(
        &self,
        matches: AlignmentSet,
        initial: &AlignmentSet,
        _listener: &dyn MatchListener,
    ) -> AlignResult<AlignmentSet> {
        let kept: AlignmentSet = matches
            .into_iter()
            .chain(initial.iter().cloned())
            .filter(|a| a.score >= self.threshold)
            .collect();
        tracing::debug!(kept = kept.len(), threshold = self.threshold, "threshold filter applied");
        Ok(kept)
    }
}
