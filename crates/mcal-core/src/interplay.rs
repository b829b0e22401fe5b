//! Interplay subgraphs `G ⊆ Γ`: groups of nodes whose outputs are fused into
//! one target and therefore must be mutually congruent.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::graph::ComputationGraph;
use crate::id::NodeId;

/// How the members' outputs are combined into the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionRule {
    WeightedAverage,
    Max,
    Min,
    Product,
    /// No fusion rule was declared for the group.
    Undeclared,
}

/// An interplay subgraph of a computation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterplaySubgraph {
    /// Member nodes. Ordered so hashing and diagnostics are stable.
    pub members: BTreeSet<NodeId>,
    /// The single artifact all members contribute to.
    pub target_output: String,
    pub fusion_rule: FusionRule,
}

impl InterplaySubgraph {
    pub fn new(
        members: impl IntoIterator<Item = NodeId>,
        target_output: impl Into<String>,
        fusion_rule: FusionRule,
    ) -> Self {
        InterplaySubgraph {
            members: members.into_iter().collect(),
            target_output: target_output.into(),
            fusion_rule,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Checks `G ⊆ Γ`: every member must be a node of `graph`.
    pub fn validate_within(&self, graph: &ComputationGraph) -> Result<(), CoreError> {
        match self.members.iter().find(|id| !graph.contains(**id)) {
            Some(&node) => Err(CoreError::InterplayNotContained {
                target: self.target_output.clone(),
                node,
            }),
            None => Ok(()),
        }
    }
}
