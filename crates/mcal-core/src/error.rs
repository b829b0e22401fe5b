//! Core error types for mcal-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! structural failure modes of the calibration data model: graph lookups,
//! the DAG invariant, interplay containment and context validation.

use crate::id::NodeId;
use crate::layer::LayerId;
use thiserror::Error;

/// Core errors produced by the mcal-core crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A node id was not found in the computation graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// An edge references a node that does not exist.
    #[error("invalid edge: {reason}")]
    InvalidEdge { reason: String },

    /// The computation graph violates the acyclicity invariant.
    #[error("cycle detected in computation graph at node {node}")]
    CycleDetected { node: NodeId },

    /// An interplay subgraph references nodes outside its containing graph.
    #[error("interplay subgraph '{target}' is not contained in the graph: node {node} missing")]
    InterplayNotContained { target: String, node: NodeId },

    /// A context tuple field is outside its legal domain.
    #[error("invalid context: {reason}")]
    InvalidContext { reason: String },

    /// A layer identifier could not be parsed.
    #[error("unknown layer id: '{raw}'")]
    UnknownLayer { raw: String },

    /// A layer score lies outside the layer's legal domain.
    #[error("score {value} is outside the domain of layer {layer}")]
    ScoreOutOfDomain { layer: LayerId, value: f64 },

    /// A role name could not be parsed.
    #[error("unknown role: '{raw}'")]
    UnknownRole { raw: String },
}
