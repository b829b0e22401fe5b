//! Deterministic audit hashing using blake3.
//!
//! Two digests accompany every result:
//!
//! - **graph hash**: the whole computation graph, nodes in `NodeId` order
//!   with their signatures, edges sorted by `(source, target, artifact)`
//! - **input hash**: everything the score was computed from (method, role,
//!   context, the node's neighbourhood, interplay membership, the layer
//!   scores and the configuration hash)
//!
//! Variable-length fields are length-prefixed and every collection is
//! iterated in a sorted order, so equal inputs always produce equal digests.

use std::collections::{BTreeMap, BTreeSet};

use mcal_core::{ComputationGraph, DataEdge, InterplaySubgraph, LayerId, LayerScore, NodeId, Role};

use crate::subject::CalibrationSubject;

fn update_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn update_set(hasher: &mut blake3::Hasher, set: &BTreeSet<String>) {
    hasher.update(&(set.len() as u64).to_le_bytes());
    for item in set {
        update_str(hasher, item);
    }
}

fn update_f64(hasher: &mut blake3::Hasher, v: f64) {
    hasher.update(&v.to_le_bytes());
}

/// Computes a blake3 hash of the whole computation graph.
pub fn hash_graph(graph: &ComputationGraph) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(graph.node_count() as u64).to_le_bytes());
    for (id, node) in graph.nodes() {
        hasher.update(&id.0.to_le_bytes());
        update_str(&mut hasher, node.method_id.as_str());
        match &node.signature {
            None => {
                hasher.update(&[0]);
            }
            Some(sig) => {
                hasher.update(&[1]);
                update_set(&mut hasher, &sig.required_inputs);
                update_set(&mut hasher, &sig.optional_inputs);
                update_set(&mut hasher, &sig.critical_optional);
                update_set(&mut hasher, &sig.outputs);
            }
        }
    }
    let spec = graph.to_spec();
    hasher.update(&(spec.edges.len() as u64).to_le_bytes());
    for edge in &spec.edges {
        hasher.update(&edge.from.0.to_le_bytes());
        hasher.update(&edge.to.0.to_le_bytes());
        update_str(&mut hasher, &edge.artifact);
    }
    hasher.finalize()
}

fn update_neighbourhood(hasher: &mut blake3::Hasher, edges: &[(NodeId, &DataEdge)]) {
    hasher.update(&(edges.len() as u64).to_le_bytes());
    for (other, edge) in edges {
        hasher.update(&other.0.to_le_bytes());
        update_str(hasher, &edge.artifact);
    }
}

fn update_interplay(hasher: &mut blake3::Hasher, interplay: Option<&InterplaySubgraph>) {
    let Some(g) = interplay else {
        hasher.update(&[0]);
        return;
    };
    hasher.update(&[1]);
    hasher.update(&(g.members.len() as u64).to_le_bytes());
    for member in &g.members {
        hasher.update(&member.0.to_le_bytes());
    }
    update_str(hasher, &g.target_output);
    update_str(hasher, &format!("{:?}", g.fusion_rule));
}

/// Computes the audit hash of one calibration's inputs and layer scores.
pub fn hash_inputs(
    subject: &CalibrationSubject<'_>,
    role: Role,
    layer_scores: &BTreeMap<LayerId, LayerScore>,
    config_hash: &str,
) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    update_str(&mut hasher, subject.method_id.as_str());
    update_str(&mut hasher, role.as_str());
    hasher.update(&subject.node.0.to_le_bytes());

    let ctx = &subject.context;
    match &ctx.question {
        Some(q) => {
            hasher.update(&[1]);
            update_str(&mut hasher, q);
        }
        None => {
            hasher.update(&[0]);
        }
    }
    update_str(&mut hasher, &ctx.dimension);
    update_str(&mut hasher, &ctx.policy_area);
    update_f64(&mut hasher, ctx.unit_quality);

    update_neighbourhood(&mut hasher, &subject.graph.incoming(subject.node));
    update_neighbourhood(&mut hasher, &subject.graph.outgoing(subject.node));
    update_interplay(&mut hasher, subject.interplay);

    hasher.update(&(layer_scores.len() as u64).to_le_bytes());
    for (layer, score) in layer_scores {
        update_str(&mut hasher, layer.as_str());
        update_f64(&mut hasher, score.score());
        update_str(&mut hasher, &score.rationale);
    }

    update_str(&mut hasher, config_hash);
    hasher.finalize()
}
