//! Matcher configuration.
//!
//! A matcher is described by a JSON object whose `name` selects the solver
//! and whose other fields are its parameters. Unknown fields are ignored and
//! every parameter except a solver's constraint has a default.
//!
//! ```
//! use entalign::MatcherConfig;
//!
//! let config = MatcherConfig::from_json(
//!     r#"{"name": "beam-search", "constraint": {"name": "bijective"}, "beam_size": 10}"#,
//! )
//! .unwrap();
//! let matcher = config.build().unwrap();
//! assert_eq!(matcher.id(), "beam-search");
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constraint::{ConstraintConfig, ConstraintFactory};
use crate::error::{AlignResult, ValidationError};
use crate::matcher::{BeamSearch, Greedy, Matcher, MonteCarloTreeSearch, Threshold, UniqueAssignment};

/// Serde predicate for thresholds left at "no threshold". JSON cannot carry
/// infinities, so such thresholds are omitted on output.
pub(crate) fn is_unbounded(threshold: &f64) -> bool {
    threshold.is_infinite() && threshold.is_sign_negative()
}

fn check_threshold(threshold: f64) -> Result<(), ValidationError> {
    if threshold.is_nan() {
        return Err(ValidationError::InvalidParameter {
            name: "threshold".to_string(),
            reason: "must be a number".to_string(),
        });
    }
    Ok(())
}

fn require_constraint(constraint: Option<&ConstraintConfig>) -> Result<Arc<dyn ConstraintFactory>, ValidationError> {
    constraint
        .map(|c| Arc::new(c.clone()) as Arc<dyn ConstraintFactory>)
        .ok_or_else(|| ValidationError::MissingField {
            field: "constraint".to_string(),
        })
}

/// Parameters of the greedy matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyConfig {
    /// Constraint to satisfy (required).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ConstraintConfig>,
    /// Minimum candidate score.
    #[serde(skip_serializing_if = "is_unbounded")]
    pub threshold: f64,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            constraint: None,
            threshold: f64::NEG_INFINITY,
        }
    }
}

/// Parameters of beam search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamSearchConfig {
    /// Constraint to satisfy (required).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ConstraintConfig>,
    /// Minimum candidate score.
    #[serde(skip_serializing_if = "is_unbounded")]
    pub threshold: f64,
    /// States kept in the beam.
    pub beam_size: usize,
    /// Candidates to visit before stopping; 0 means all.
    pub max_iterations: usize,
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        Self {
            constraint: None,
            threshold: f64::NEG_INFINITY,
            beam_size: 100,
            max_iterations: 0,
        }
    }
}

/// Parameters of Monte Carlo tree search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Constraint to satisfy (required).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ConstraintConfig>,
    /// Minimum candidate score.
    #[serde(skip_serializing_if = "is_unbounded")]
    pub threshold: f64,
    /// Exploration constant.
    pub ce: f64,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Random seed; drawn from the OS when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Wall-clock budget in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            constraint: None,
            threshold: f64::NEG_INFINITY,
            ce: 2.0,
            max_iterations: 100_000,
            seed: None,
            max_duration_ms: None,
        }
    }
}

/// A matcher selected by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum MatcherConfig {
    /// Score cut-off with no constraint.
    Threshold(Threshold),
    /// Best-first greedy selection.
    Greedy(GreedyConfig),
    /// Beam search.
    BeamSearch(BeamSearchConfig),
    /// Monte Carlo tree search.
    MonteCarlo(MonteCarloConfig),
    /// Exact one-to-one assignment.
    Unique(UniqueAssignment),
}

impl MatcherConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// `ValidationError::InvalidConfig` for malformed JSON or an unknown
    /// matcher name.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a configuration from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// As [`MatcherConfig::from_json`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Registry id of the selected matcher.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Threshold(_) => "threshold",
            Self::Greedy(_) => "greedy",
            Self::BeamSearch(_) => "beam-search",
            Self::MonteCarlo(_) => "monte-carlo",
            Self::Unique(_) => "unique",
        }
    }

    /// Checks the parameters without building anything.
    ///
    /// # Errors
    ///
    /// `MissingField` if a constrained matcher has no constraint, or
    /// `InvalidParameter` for an out-of-range knob.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Threshold(c) => check_threshold(c.threshold),
            Self::Greedy(c) => {
                require_constraint(c.constraint.as_ref())?;
                check_threshold(c.threshold)
            }
            Self::BeamSearch(c) => {
                require_constraint(c.constraint.as_ref())?;
                check_threshold(c.threshold)?;
                if c.beam_size == 0 {
                    return Err(ValidationError::InvalidParameter {
                        name: "beam_size".to_string(),
                        reason: "must be > 0".to_string(),
                    });
                }
                Ok(())
            }
            Self::MonteCarlo(c) => {
                require_constraint(c.constraint.as_ref())?;
                check_threshold(c.threshold)?;
                if c.max_iterations == 0 {
                    return Err(ValidationError::InvalidParameter {
                        name: "max_iterations".to_string(),
                        reason: "must be > 0".to_string(),
                    });
                }
                if !c.ce.is_finite() || c.ce < 0.0 {
                    return Err(ValidationError::InvalidParameter {
                        name: "ce".to_string(),
                        reason: format!("must be a finite non-negative number, got {}", c.ce),
                    });
                }
                Ok(())
            }
            Self::Unique(c) => {
                check_threshold(c.threshold)?;
                if !(c.base_probability > 0.0 && c.base_probability <= 1.0) {
                    return Err(ValidationError::InvalidParameter {
                        name: "base_probability".to_string(),
                        reason: format!("must be in (0, 1], got {}", c.base_probability),
                    });
                }
                Ok(())
            }
        }
    }

    /// Validates and builds the matcher.
    ///
    /// # Errors
    ///
    /// Any error from [`MatcherConfig::validate`].
    pub fn build(&self) -> AlignResult<Box<dyn Matcher>> {
        self.validate()?;
        let matcher: Box<dyn Matcher> = match self {
            Self::Threshold(c) => Box::new(*c),
            Self::Greedy(c) => Box::new(
                Greedy::from_factory(require_constraint(c.constraint.as_ref())?).with_threshold(c.threshold),
            ),
            Self::BeamSearch(c) => Box::new(
                BeamSearch::from_factory(require_constraint(c.constraint.as_ref())?)
                    .with_threshold(c.threshold)
                    .with_beam_size(c.beam_size)
                    .with_max_iterations(c.max_iterations),
            ),
            Self::MonteCarlo(c) => {
                let mut m = MonteCarloTreeSearch::from_factory(require_constraint(c.constraint.as_ref())?)
                    .with_threshold(c.threshold)
                    .with_ce(c.ce)
                    .with_max_iterations(c.max_iterations);
                if let Some(seed) = c.seed {
                    m = m.with_seed(seed);
                }
                if let Some(ms) = c.max_duration_ms {
                    m = m.with_max_duration(Duration::from_millis(ms));
                }
                Box::new(m)
            }
            Self::Unique(c) => Box::new(*c),
        };
        tracing::debug!(matcher = self.id(), "matcher built");
        Ok(matcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Bijective, Surjection};
    use serde_json::json;

    #[test]
    fn defaults_per_matcher() {
        let t = MatcherConfig::from_json(r#"{"name": "threshold"}"#).unwrap();
        assert_eq!(t, MatcherConfig::Threshold(Threshold::new(0.5)));

        let b = MatcherConfig::from_json(r#"{"name": "beam-search", "constraint": {"name": "bijective"}}"#)
            .unwrap();
        let MatcherConfig::BeamSearch(b) = b else {
            panic!("wrong variant");
        };
        assert_eq!(b.beam_size, 100);
        assert_eq!(b.max_iterations, 0);
        assert!(is_unbounded(&b.threshold));

        let m = MatcherConfig::from_json(r#"{"name": "monte-carlo", "constraint": {"name": "bijective"}}"#)
            .unwrap();
        let MatcherConfig::MonteCarlo(m) = m else {
            panic!("wrong variant");
        };
        assert!((m.ce - 2.0).abs() < f64::EPSILON);
        assert_eq!(m.max_iterations, 100_000);
        assert_eq!(m.seed, None);

        let u = MatcherConfig::from_json(r#"{"name": "unique"}"#).unwrap();
        assert_eq!(u, MatcherConfig::Unique(UniqueAssignment::default()));
    }

    #[test]
    fn ids_match_names() {
        for name in ["threshold", "greedy", "beam-search", "monte-carlo", "unique"] {
            let config = MatcherConfig::from_value(json!({
                "name": name,
                "constraint": {"name": "bijective"},
            }))
            .unwrap();
            assert_eq!(config.id(), name);
            assert_eq!(config.build().unwrap().id(), name);
        }
    }

    #[test]
    fn missing_constraint_is_reported() {
        for name in ["greedy", "beam-search", "monte-carlo"] {
            let config = MatcherConfig::from_value(json!({ "name": name })).unwrap();
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ValidationError::MissingField { ref field } if field == "constraint"));
            assert!(config.build().unwrap_err().is_validation());
        }
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let cases = [
            json!({"name": "beam-search", "constraint": {"name": "bijective"}, "beam_size": 0}),
            json!({"name": "monte-carlo", "constraint": {"name": "bijective"}, "max_iterations": 0}),
            json!({"name": "monte-carlo", "constraint": {"name": "bijective"}, "ce": -1.0}),
            json!({"name": "unique", "base_probability": 0.0}),
            json!({"name": "unique", "base_probability": 1.5}),
        ];
        for case in cases {
            let config = MatcherConfig::from_value(case.clone()).unwrap();
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidParameter { .. }),
                "{case} gave {err}"
            );
        }
    }

    #[test]
    fn unknown_matcher_is_invalid_config() {
        let err = MatcherConfig::from_json(r#"{"name": "simulated-annealing"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { .. }));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config = MatcherConfig::from_json(r#"{"name": "threshold", "threshold": 0.7, "colour": "red"}"#).unwrap();
        assert_eq!(config, MatcherConfig::Threshold(Threshold::new(0.7)));
    }

    #[test]
    fn serializes_without_infinite_thresholds() {
        let config = MatcherConfig::Greedy(GreedyConfig {
            constraint: Some(ConstraintConfig::Bijective(Bijective::new(Surjection::Surjective))),
            ..GreedyConfig::default()
        });
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["name"], "greedy");
        assert!(value.get("threshold").is_none());
        let back = MatcherConfig::from_value(value).unwrap();
        assert_eq!(back, config);
    }
}
