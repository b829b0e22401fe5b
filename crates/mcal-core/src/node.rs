//! Method-instance nodes and their signatures `S`.
//!
//! A [`MethodNode`] is one placement of a method artifact inside a pipeline.
//! Its [`NodeSignature`] declares which artifacts it consumes and produces;
//! the chain layer checks the node's actual edges against it. Signature
//! fields use `BTreeSet` so iteration (and therefore hashing and diagnostics)
//! is deterministic.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::MethodId;

/// Declared input/output contract of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSignature {
    /// Inputs without which the method cannot run.
    #[serde(default)]
    pub required_inputs: BTreeSet<String>,
    /// Inputs the method uses when available.
    #[serde(default)]
    pub optional_inputs: BTreeSet<String>,
    /// Subset of the optional inputs whose absence materially degrades output.
    #[serde(default)]
    pub critical_optional: BTreeSet<String>,
    /// Artifacts the method produces.
    #[serde(default)]
    pub outputs: BTreeSet<String>,
}

impl NodeSignature {
    /// Returns `true` if `artifact` is one of the declared inputs.
    pub fn accepts(&self, artifact: &str) -> bool {
        self.required_inputs.contains(artifact)
            || self.optional_inputs.contains(artifact)
            || self.critical_optional.contains(artifact)
    }

    pub fn produces(&self, artifact: &str) -> bool {
        self.outputs.contains(artifact)
    }
}

/// A node of the computation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    /// Method artifact placed at this node.
    pub method_id: MethodId,
    /// Declared signature, or `None` when the method never declared one.
    #[serde(default)]
    pub signature: Option<NodeSignature>,
}

impl MethodNode {
    pub fn new(method_id: impl Into<MethodId>, signature: NodeSignature) -> Self {
        MethodNode {
            method_id: method_id.into(),
            signature: Some(signature),
        }
    }

    /// A node whose method never declared a signature.
    pub fn undeclared(method_id: impl Into<MethodId>) -> Self {
        MethodNode {
            method_id: method_id.into(),
            signature: None,
        }
    }
}
