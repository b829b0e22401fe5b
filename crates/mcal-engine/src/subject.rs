//! The calibration subject `I = (M, v, Γ, G, ctx)`.

use mcal_core::{ComputationGraph, ContextTuple, InterplaySubgraph, MethodId, NodeId};

/// Everything a single calibration call is about.
///
/// Borrows the graph and interplay subgraph from their owner; a subject is
/// built per call and dropped with the result.
#[derive(Debug, Clone)]
pub struct CalibrationSubject<'a> {
    /// `M`: the method being scored.
    pub method_id: MethodId,
    /// `v`: the node the method occupies.
    pub node: NodeId,
    /// `Γ`: the containing computation graph.
    pub graph: &'a ComputationGraph,
    /// `G`: the interplay subgraph, when the node takes part in one.
    pub interplay: Option<&'a InterplaySubgraph>,
    pub context: ContextTuple,
}

impl<'a> CalibrationSubject<'a> {
    pub fn new(
        method_id: impl Into<MethodId>,
        node: NodeId,
        graph: &'a ComputationGraph,
        context: ContextTuple,
    ) -> Self {
        CalibrationSubject {
            method_id: method_id.into(),
            node,
            graph,
            interplay: None,
            context,
        }
    }

    pub fn with_interplay(mut self, interplay: &'a InterplaySubgraph) -> Self {
        self.interplay = Some(interplay);
        self
    }
}
