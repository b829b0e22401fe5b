//! The eight layer evaluators.
//!
//! Every evaluator implements [`LayerEvaluator`]: given an
//! [`EvaluationInput`] it returns the layer's score, or an error for
//! structural failures. Missing evidence is never an error at this level;
//! evaluators replace it with the configured penalty through [`penalize`],
//! which also records an [`AppliedPenalty`] for the audit trail.
//!
//! # Modules
//!
//! - [`base`]: `@b`, blend of theory, implementation and deployment
//! - [`chain`]: `@chain`, node signature against actual edges
//! - [`unit`]: `@u`, role-specific transform of the unit quality
//! - [`contextual`]: `@q`, `@d`, `@p`, compatibility table bands
//! - [`congruence`]: `@C`, consistency across an interplay subgraph
//! - [`meta`]: `@m`, transparency, governance and cost

pub mod base;
pub mod chain;
pub mod congruence;
pub mod contextual;
pub mod meta;
pub mod unit;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use mcal_config::ConfigurationStore;
use mcal_core::{LayerId, LayerScore, LayerSet, Role};

use crate::cancel::CancellationToken;
use crate::error::{EvaluationError, EvidenceError};
use crate::evidence::{ContextAxis, EvidenceProvider};
use crate::subject::CalibrationSubject;

pub use base::BaseEvaluator;
pub use chain::ChainEvaluator;
pub use congruence::CongruenceEvaluator;
pub use contextual::ContextualEvaluator;
pub use meta::MetaEvaluator;
pub use unit::UnitEvaluator;

/// Penalty applied when a method has no base-layer evidence.
pub const UNCALIBRATED_METHOD: &str = "uncalibrated_method";
/// Penalty applied when a method has no governance record.
pub const MISSING_GOVERNANCE_EVIDENCE: &str = "missing_governance_evidence";
/// Penalty applied when a method has no compatibility table for an axis.
pub const MISSING_COMPATIBILITY_DATA: &str = "missing_compatibility_data";
/// Penalty applied when an interplay member has no profile.
pub const MISSING_INTERPLAY_EVIDENCE: &str = "missing_interplay_evidence";

/// Score used for a penalty key the penalties document does not configure.
pub const DEFAULT_PENALTY: f64 = 0.1;

/// Everything an evaluator may read.
#[derive(Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub subject: &'a CalibrationSubject<'a>,
    pub role: Role,
    pub config: &'a ConfigurationStore,
    pub evidence: &'a dyn EvidenceProvider,
    pub cancel: &'a CancellationToken,
}

/// A penalty substituted for missing evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPenalty {
    pub layer: LayerId,
    pub key: String,
    /// The configured penalty value, or [`DEFAULT_PENALTY`] when the key is
    /// not configured.
    pub value: f64,
    pub configured: bool,
    pub reason: String,
}

/// Result of evaluating one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutcome {
    pub score: LayerScore,
    pub penalty: Option<AppliedPenalty>,
}

impl LayerOutcome {
    pub fn scored(score: LayerScore) -> Self {
        LayerOutcome {
            score,
            penalty: None,
        }
    }
}

/// Uniform contract of the eight layer evaluators.
pub trait LayerEvaluator: Send + Sync {
    fn layer(&self) -> LayerId;

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<LayerOutcome, EvaluationError>;
}

/// Scores `layer` with the penalty configured under `key`.
///
/// An unconfigured key falls back to [`DEFAULT_PENALTY`] and says so in the
/// rationale.
pub fn penalize(
    input: &EvaluationInput<'_>,
    layer: LayerId,
    key: &str,
    reason: impl fmt::Display,
) -> Result<LayerOutcome, EvaluationError> {
    let configured = input.config.get_penalty(key);
    let value = configured.unwrap_or(DEFAULT_PENALTY);
    let rationale = match configured {
        Some(value) => format!("{reason}; {key} penalty {value}"),
        None => format!("{reason}; {key} penalty not configured, using default {value}"),
    };
    tracing::warn!(
        method = %input.subject.method_id,
        %layer,
        penalty = key,
        value,
        "evidence missing, applying penalty"
    );
    let score = LayerScore::from_penalty(layer, value, rationale)?;
    Ok(LayerOutcome {
        score,
        penalty: Some(AppliedPenalty {
            layer,
            key: key.to_string(),
            value,
            configured: configured.is_some(),
            reason: reason.to_string(),
        }),
    })
}

/// Separates missing evidence (`Ok(None)`) from failures that must propagate.
pub(crate) fn recover_missing<T>(
    layer: LayerId,
    result: Result<T, EvidenceError>,
) -> Result<Option<T>, EvaluationError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(EvidenceError::Missing { .. }) => Ok(None),
        Err(EvidenceError::Cancelled) => Err(EvaluationError::Cancelled),
        Err(source) => Err(EvaluationError::Evidence { layer, source }),
    }
}

// ---------------------------------------------------------------------------
// Evaluator registry
// ---------------------------------------------------------------------------

/// The evaluators available to the orchestrator, one per layer.
pub struct EvaluatorSet {
    evaluators: BTreeMap<LayerId, Box<dyn LayerEvaluator>>,
}

impl EvaluatorSet {
    /// No evaluators.
    pub fn empty() -> Self {
        EvaluatorSet {
            evaluators: BTreeMap::new(),
        }
    }

    /// One standard evaluator for each of the eight layers.
    pub fn standard() -> Self {
        let mut set = EvaluatorSet::empty();
        set.insert(BaseEvaluator);
        set.insert(ChainEvaluator);
        set.insert(UnitEvaluator);
        for axis in ContextAxis::ALL {
            set.insert(ContextualEvaluator::new(axis));
        }
        set.insert(CongruenceEvaluator);
        set.insert(MetaEvaluator);
        set
    }

    /// Installs `evaluator`, replacing any evaluator for the same layer.
    pub fn insert(&mut self, evaluator: impl LayerEvaluator + 'static) {
        self.evaluators.insert(evaluator.layer(), Box::new(evaluator));
    }

    pub fn with(mut self, evaluator: impl LayerEvaluator + 'static) -> Self {
        self.insert(evaluator);
        self
    }

    /// Drops the evaluator for `layer`, if any.
    pub fn without(mut self, layer: LayerId) -> Self {
        self.evaluators.remove(&layer);
        self
    }

    pub fn get(&self, layer: LayerId) -> Option<&dyn LayerEvaluator> {
        self.evaluators.get(&layer).map(|e| e.as_ref())
    }

    /// Layers that have an evaluator.
    pub fn layers(&self) -> LayerSet {
        self.evaluators.keys().copied().collect()
    }
}

impl Default for EvaluatorSet {
    fn default() -> Self {
        EvaluatorSet::standard()
    }
}

impl fmt::Debug for EvaluatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorSet")
            .field("layers", &self.layers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::InMemoryEvidence;
    use mcal_core::ContextBand;

    fn penalize_without_table(layer: LayerId, key: &str) -> LayerOutcome {
        let store = ConfigurationStore::from_documents(fixtures::WEIGHTS, "{}", "{}").unwrap();
        let (graph, node) = fixtures::lone_node("m");
        let subject = CalibrationSubject::new("m", node, &graph, fixtures::context(None, 1.0));
        let evidence = InMemoryEvidence::new();
        let cancel = CancellationToken::new();
        let input = EvaluationInput {
            subject: &subject,
            role: Role::Transform,
            config: &store,
            evidence: &evidence,
            cancel: &cancel,
        };
        penalize(&input, layer, key, "no evidence").unwrap()
    }

    #[test]
    fn unconfigured_key_uses_default_penalty() {
        let outcome = penalize_without_table(LayerId::Base, UNCALIBRATED_METHOD);
        assert_eq!(outcome.score.score(), DEFAULT_PENALTY);
        assert!(
            outcome.score.rationale.contains("not configured, using default 0.1"),
            "{}",
            outcome.score.rationale
        );

        let penalty = outcome.penalty.unwrap();
        assert_eq!(penalty.value, DEFAULT_PENALTY);
        assert!(!penalty.configured);
    }

    #[test]
    fn default_penalty_floors_to_a_legal_band() {
        let outcome = penalize_without_table(LayerId::Question, MISSING_COMPATIBILITY_DATA);
        assert_eq!(outcome.score.score(), ContextBand::Undeclared.value());
        assert!(!outcome.penalty.unwrap().configured);
    }
}

// ---------------------------------------------------------------------------
// Shared test fixtures
// ---------------------------------------------------------------------------
