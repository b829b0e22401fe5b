//! ComputationGraph: the data-flow graph `Γ = (V, E, T, S)` method instances
//! live in.
//!
//! [`ComputationGraph`] wraps a petgraph `StableGraph<MethodNode, DataEdge>`:
//! nodes carry the method identity and signature (`S`), edges carry the
//! artifact name (`T`). The graph is built and owned by the ingestion
//! pipeline and is read-only to the calibration engine.
//!
//! # Acyclicity
//!
//! `Γ` must be a DAG. Edge insertion does not reject cycles, because graphs
//! usually arrive fully formed from outside; [`ComputationGraph::validate_acyclic`]
//! checks the invariant and the orchestrator refuses to score any node of a
//! cyclic graph.
//!
//! # Serialization
//!
//! The serde form is a flat [`GraphSpec`]: a node list (position = `NodeId`)
//! and an edge list referencing node positions.

use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::edge::DataEdge;
use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::MethodNode;

/// The computation graph container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphSpec", into = "GraphSpec")]
pub struct ComputationGraph {
    graph: StableGraph<MethodNode, DataEdge, Directed, u32>,
}

/// Flat serialized form of a [`ComputationGraph`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSpec {
    pub nodes: Vec<MethodNode>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

/// One edge of a [`GraphSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: NodeId,
    pub to: NodeId,
    pub artifact: String,
}

impl ComputationGraph {
    pub fn new() -> Self {
        ComputationGraph {
            graph: StableGraph::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Mutation (used by the owning pipeline while building)
    // -----------------------------------------------------------------------

    pub fn add_node(&mut self, node: MethodNode) -> NodeId {
        NodeId::from(self.graph.add_node(node))
    }

    /// Adds a data edge `from -> to` carrying `edge.artifact`.
    ///
    /// Errors if either endpoint is missing. Does not check acyclicity.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, edge: DataEdge) -> Result<(), CoreError> {
        for id in [from, to] {
            if !self.contains(id) {
                return Err(CoreError::InvalidEdge {
                    reason: format!("edge {from} -> {to} references missing node {id}"),
                });
            }
        }
        self.graph.add_edge(from.into(), to.into(), edge);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn contains(&self, id: NodeId) -> bool {
        let idx: NodeIndex<u32> = id.into();
        self.graph.contains_node(idx)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&MethodNode> {
        let idx: NodeIndex<u32> = id.into();
        self.graph.node_weight(idx)
    }

    /// Like [`get_node`](Self::get_node) but with a structured error.
    pub fn node(&self, id: NodeId) -> Result<&MethodNode, CoreError> {
        self.get_node(id).ok_or(CoreError::NodeNotFound { id })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes in ascending `NodeId` order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &MethodNode)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx).map(|n| (NodeId::from(idx), n)))
    }

    /// Incoming edges of `id` as `(source, edge)`, sorted by source then artifact.
    pub fn incoming(&self, id: NodeId) -> Vec<(NodeId, &DataEdge)> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Outgoing edges of `id` as `(target, edge)`, sorted by target then artifact.
    pub fn outgoing(&self, id: NodeId) -> Vec<(NodeId, &DataEdge)> {
        self.neighbours(id, Direction::Outgoing)
    }

    fn neighbours(&self, id: NodeId, direction: Direction) -> Vec<(NodeId, &DataEdge)> {
        let idx: NodeIndex<u32> = id.into();
        let mut out: Vec<(NodeId, &DataEdge)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|edge_ref| {
                let other = match direction {
                    Direction::Incoming => edge_ref.source(),
                    Direction::Outgoing => edge_ref.target(),
                };
                (NodeId::from(other), edge_ref.weight())
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.artifact.cmp(&b.1.artifact)));
        out
    }

    /// Checks the DAG invariant.
    ///
    /// Returns [`CoreError::CycleDetected`] naming a node on a cycle.
    pub fn validate_acyclic(&self) -> Result<(), CoreError> {
        toposort(&self.graph, None).map(|_| ()).map_err(|cycle| CoreError::CycleDetected {
            node: NodeId::from(cycle.node_id()),
        })
    }

    /// Builds a graph from its flat form, validating edge endpoints.
    pub fn from_spec(spec: GraphSpec) -> Result<Self, CoreError> {
        let mut graph = ComputationGraph::new();
        for node in spec.nodes {
            graph.add_node(node);
        }
        for edge in spec.edges {
            graph.add_edge(edge.from, edge.to, DataEdge::new(edge.artifact))?;
        }
        Ok(graph)
    }

    pub fn to_spec(&self) -> GraphSpec {
        let nodes = self.nodes().map(|(_, n)| n.clone()).collect();
        let mut edges: Vec<EdgeSpec> = IntoEdgeReferences::edge_references(&self.graph)
            .map(|e| EdgeSpec {
                from: NodeId::from(e.source()),
                to: NodeId::from(e.target()),
                artifact: e.weight().artifact.clone(),
            })
            .collect();
        edges.sort_by(|a, b| {
            (a.from, a.to, &a.artifact).cmp(&(b.from, b.to, &b.artifact))
        });
        GraphSpec { nodes, edges }
    }
}

impl TryFrom<GraphSpec> for ComputationGraph {
    type Error = CoreError;

    fn try_from(spec: GraphSpec) -> Result<Self, Self::Error> {
        ComputationGraph::from_spec(spec)
    }
}

impl From<ComputationGraph> for GraphSpec {
    fn from(graph: ComputationGraph) -> Self {
        graph.to_spec()
    }
}
