//! Error types for the calibration engine.
//!
//! Three tiers, from innermost to outermost:
//!
//! - [`EvidenceError`]: produced by evidence collaborators. `Missing` is
//!   recovered inside evaluators as a penalty score; everything else
//!   propagates.
//! - [`EvaluationError`]: what a single layer evaluator can fail with.
//! - [`EngineError`]: what `calibrate` surfaces to the caller.

use std::fmt;

use mcal_core::{CoreError, LayerId, LayerSet, MethodId, NodeId, Role};

use crate::evidence::ContextAxis;

/// The kind of evidence a lookup asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceKind {
    Base,
    Governance,
    Compatibility(ContextAxis),
    Interplay,
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceKind::Base => f.write_str("base"),
            EvidenceKind::Governance => f.write_str("governance"),
            EvidenceKind::Compatibility(axis) => write!(f, "{axis} compatibility"),
            EvidenceKind::Interplay => f.write_str("interplay"),
        }
    }
}

/// Errors returned by an [`EvidenceProvider`](crate::evidence::EvidenceProvider).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvidenceError {
    /// The collaborator has no data of this kind for the method.
    #[error("no {kind} evidence for method '{method}'")]
    Missing { method: MethodId, kind: EvidenceKind },

    /// The collaborator itself failed (I/O, transport, corrupt record).
    #[error("{kind} evidence lookup failed for method '{method}': {message}")]
    Backend {
        method: MethodId,
        kind: EvidenceKind,
        message: String,
    },

    /// The caller's cancellation token fired or its deadline passed.
    #[error("evidence lookup cancelled")]
    Cancelled,
}

/// Errors produced by a single layer evaluator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// A structural problem with the graph or a score outside its domain.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An evidence lookup failed for a reason other than missing data.
    #[error("layer {layer}: {source}")]
    Evidence {
        layer: LayerId,
        #[source]
        source: EvidenceError,
    },

    #[error("evaluation cancelled")]
    Cancelled,
}

/// Errors surfaced by the calibration orchestrator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// No valid configuration has been installed.
    #[error("calibration engine is not ready: no valid configuration loaded")]
    NotReady,

    /// The method id is not known to the evidence registry.
    #[error("unknown method: '{method}' is not registered for calibration")]
    UnknownMethod { method: MethodId },

    /// The computation graph or interplay subgraph is structurally invalid.
    #[error("graph error: {0}")]
    Graph(#[from] CoreError),

    /// The subject names a node that holds a different method.
    #[error("node {node} holds method '{found}', not '{expected}'")]
    SubjectMismatch {
        node: NodeId,
        expected: MethodId,
        found: MethodId,
    },

    /// Some layers the role requires have no evaluator.
    #[error("completeness violation for '{method}' ({role}): layers {missing} cannot be evaluated")]
    CompletenessViolation {
        method: MethodId,
        role: Role,
        missing: LayerSet,
    },

    /// An evidence collaborator failed while scoring a layer.
    #[error("evidence failure on layer {layer}: {source}")]
    Evidence {
        layer: LayerId,
        #[source]
        source: EvidenceError,
    },

    /// The evaluated layers carry no configured weight.
    #[error("no active aggregation weight for layers {layers}")]
    NoActiveWeights { layers: LayerSet },

    #[error("calibration cancelled")]
    Cancelled,
}

impl From<EvaluationError> for EngineError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::Core(core) => EngineError::Graph(core),
            EvaluationError::Evidence { layer, source } => EngineError::Evidence { layer, source },
            EvaluationError::Cancelled => EngineError::Cancelled,
        }
    }
}
