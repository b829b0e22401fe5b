//! The calibration orchestrator.
//!
//! One [`CalibrationOrchestrator`] is built at process start and shared by
//! reference. It owns the configuration handle, the evaluator registry, the
//! default evidence provider and the clock.
//!
//! # Lifecycle
//!
//! `Uninitialized` until a configuration is installed, `Ready` afterwards.
//! A failed load leaves the state as it was, so a fresh orchestrator whose
//! first load fails stays `Uninitialized` and rejects every call with
//! [`EngineError::NotReady`].
//!
//! # One calibration
//!
//! 1. take a snapshot of the configuration
//! 2. check the graph is acyclic, the node exists and holds the method, and
//!    the interplay subgraph is contained in the graph
//! 3. check the method is registered
//! 4. check every layer the role requires has an evaluator
//! 5. evaluate the required layers, checking cancellation before each
//! 6. aggregate, classify and hash

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;

use mcal_config::{
    ConfigHandle, ConfigPaths, ConfigValidationError, ConfigurationStore, ThresholdScope,
};
use mcal_core::{LayerId, LayerScore, Role};

use crate::cancel::CancellationToken;
use crate::choquet::ChoquetAggregator;
use crate::clock::{Clock, SystemClock};
use crate::error::EngineError;
use crate::evidence::EvidenceProvider;
use crate::hash::{hash_graph, hash_inputs};
use crate::layers::{EvaluationInput, EvaluatorSet};
use crate::requirements::required_layers;
use crate::result::CalibrationResult;
use crate::subject::CalibrationSubject;

/// Whether the orchestrator accepts calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready,
}

/// One entry of a batch.
#[derive(Debug, Clone)]
pub struct CalibrationRequest<'a> {
    pub subject: CalibrationSubject<'a>,
    pub role: Role,
}

pub struct CalibrationOrchestrator {
    config: ConfigHandle,
    evaluators: EvaluatorSet,
    evidence: Arc<dyn EvidenceProvider>,
    clock: Arc<dyn Clock>,
}

impl CalibrationOrchestrator {
    /// An orchestrator with no configuration, the standard evaluators and the
    /// system clock.
    pub fn new(evidence: Arc<dyn EvidenceProvider>) -> Self {
        CalibrationOrchestrator {
            config: ConfigHandle::empty(),
            evaluators: EvaluatorSet::standard(),
            evidence,
            clock: Arc::new(SystemClock),
        }
    }

    /// An orchestrator that is `Ready` with `store`.
    pub fn with_store(store: ConfigurationStore, evidence: Arc<dyn EvidenceProvider>) -> Self {
        let orchestrator = CalibrationOrchestrator::new(evidence);
        orchestrator.install(store);
        orchestrator
    }

    pub fn with_evaluators(mut self, evaluators: EvaluatorSet) -> Self {
        self.evaluators = evaluators;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> EngineState {
        if self.config.is_loaded() {
            EngineState::Ready
        } else {
            EngineState::Uninitialized
        }
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Option<Arc<ConfigurationStore>> {
        self.config.snapshot()
    }

    /// Loads configuration from disk and installs it. Used both for the
    /// initial load and for explicit reloads.
    pub fn load(
        &self,
        paths: &ConfigPaths,
    ) -> Result<Arc<ConfigurationStore>, ConfigValidationError> {
        match self.config.load(paths) {
            Ok(store) => {
                tracing::info!(
                    config_hash = store.config_hash(),
                    layers = store.aggregation().linear_weights().len(),
                    interactions = store.aggregation().interactions().len(),
                    "calibration engine ready"
                );
                Ok(store)
            }
            Err(err) => {
                tracing::warn!(error = %err, state = ?self.state(), "configuration rejected");
                Err(err)
            }
        }
    }

    /// Installs an already validated configuration.
    pub fn install(&self, store: ConfigurationStore) {
        self.config.install(store);
    }

    pub fn evidence(&self) -> &dyn EvidenceProvider {
        self.evidence.as_ref()
    }

    /// Calibrates `subject` with the default evidence provider and no
    /// deadline.
    pub fn calibrate(
        &self,
        subject: &CalibrationSubject<'_>,
        role: Role,
    ) -> Result<CalibrationResult, EngineError> {
        self.calibrate_with(subject, role, self.evidence.as_ref(), &CancellationToken::new())
    }

    /// Calibrates `subject` against an explicit evidence provider and
    /// cancellation token.
    pub fn calibrate_with(
        &self,
        subject: &CalibrationSubject<'_>,
        role: Role,
        evidence: &dyn EvidenceProvider,
        cancel: &CancellationToken,
    ) -> Result<CalibrationResult, EngineError> {
        let config = self.config.snapshot().ok_or(EngineError::NotReady)?;

        subject.graph.validate_acyclic()?;
        let node = subject.graph.node(subject.node)?;
        if node.method_id != subject.method_id {
            return Err(EngineError::SubjectMismatch {
                node: subject.node,
                expected: subject.method_id.clone(),
                found: node.method_id.clone(),
            });
        }
        if let Some(interplay) = subject.interplay {
            interplay.validate_within(subject.graph)?;
        }

        if !evidence.is_registered(&subject.method_id) {
            return Err(EngineError::UnknownMethod {
                method: subject.method_id.clone(),
            });
        }

        let required = required_layers(role);
        let missing = required.difference(self.evaluators.layers());
        if !missing.is_empty() {
            return Err(EngineError::CompletenessViolation {
                method: subject.method_id.clone(),
                role,
                missing,
            });
        }

        let input = EvaluationInput {
            subject,
            role,
            config: &config,
            evidence,
            cancel,
        };
        let mut layer_scores: BTreeMap<LayerId, LayerScore> = BTreeMap::new();
        let mut penalties = Vec::new();
        for layer in required.iter() {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let Some(evaluator) = self.evaluators.get(layer) else {
                return Err(EngineError::CompletenessViolation {
                    method: subject.method_id.clone(),
                    role,
                    missing: [layer].into_iter().collect(),
                });
            };
            let outcome = evaluator.evaluate(&input)?;
            tracing::debug!(
                method = %subject.method_id,
                %layer,
                score = outcome.score.score(),
                "layer evaluated"
            );
            penalties.extend(outcome.penalty);
            layer_scores.insert(layer, outcome.score);
        }
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let values: BTreeMap<LayerId, f64> = layer_scores
            .iter()
            .map(|(&layer, score)| (layer, score.score()))
            .collect();
        let breakdown = ChoquetAggregator::new(config.aggregation()).aggregate(&values)?;
        let final_score = breakdown.final_score;
        let quality = config.classify(ThresholdScope::Final, final_score);

        let graph_hash = hash_graph(subject.graph).to_hex().to_string();
        let input_hash = hash_inputs(subject, role, &layer_scores, config.config_hash())
            .to_hex()
            .to_string();

        tracing::info!(
            method = %subject.method_id,
            %role,
            final_score,
            penalties = penalties.len(),
            "calibration complete"
        );

        Ok(CalibrationResult {
            method_id: subject.method_id.clone(),
            role,
            node: subject.node,
            final_score,
            quality,
            layer_scores,
            breakdown,
            penalties,
            config_hash: config.config_hash().to_string(),
            graph_hash,
            input_hash,
            timestamp: self.clock.now(),
        })
    }

    /// Calibrates every request in parallel. Results are in request order.
    pub fn calibrate_batch(
        &self,
        requests: &[CalibrationRequest<'_>],
        cancel: &CancellationToken,
    ) -> Vec<Result<CalibrationResult, EngineError>> {
        requests
            .par_iter()
            .map(|req| self.calibrate_with(&req.subject, req.role, self.evidence.as_ref(), cancel))
            .collect()
    }
}

impl std::fmt::Debug for CalibrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationOrchestrator")
            .field("state", &self.state())
            .field("evaluators", &self.evaluators)
            .field("clock", &self.clock)
            .finish()
    }
}
