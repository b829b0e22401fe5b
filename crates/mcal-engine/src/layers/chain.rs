//! `@chain`: does the node's wiring honour its declared signature?
//!
//! Inbound edge artifacts are checked against the node's inputs and outbound
//! artifacts against its outputs. The worst finding decides the band:
//!
//! | finding                                                  | band |
//! |----------------------------------------------------------|------|
//! | no signature, missing required input, undeclared output  | 0.0  |
//! | missing critical optional input                          | 0.3  |
//! | more than half of the plain optional inputs missing      | 0.6  |
//! | some optional inputs missing, or undeclared inputs       | 0.8  |
//! | none                                                     | 1.0  |
//!
//! An undeclared output is an outbound edge carrying an artifact the
//! signature does not list.

use std::collections::BTreeSet;

use mcal_core::{ChainBand, LayerId, LayerScore, NodeSignature};

use super::{EvaluationInput, LayerEvaluator, LayerOutcome};
use crate::error::EvaluationError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ChainEvaluator;

impl LayerEvaluator for ChainEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::Chain
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<LayerOutcome, EvaluationError> {
        let subject = input.subject;
        let node = subject.graph.node(subject.node)?;

        let Some(signature) = &node.signature else {
            return Ok(LayerOutcome::scored(LayerScore::chain(
                ChainBand::HardMismatch,
                format!("node {} declares no signature", subject.node),
            )));
        };

        let inbound: BTreeSet<&str> = subject
            .graph
            .incoming(subject.node)
            .into_iter()
            .map(|(_, edge)| edge.artifact.as_str())
            .collect();
        let outbound: BTreeSet<&str> = subject
            .graph
            .outgoing(subject.node)
            .into_iter()
            .map(|(_, edge)| edge.artifact.as_str())
            .collect();

        let (band, rationale) = classify(signature, &inbound, &outbound);
        Ok(LayerOutcome::scored(LayerScore::chain(band, rationale)))
    }
}

fn classify(
    signature: &NodeSignature,
    inbound: &BTreeSet<&str>,
    outbound: &BTreeSet<&str>,
) -> (ChainBand, String) {
    let missing = |set: &BTreeSet<String>| -> Vec<String> {
        set.iter()
            .filter(|a| !inbound.contains(a.as_str()))
            .cloned()
            .collect()
    };

    let missing_required = missing(&signature.required_inputs);
    if !missing_required.is_empty() {
        return (
            ChainBand::HardMismatch,
            format!("missing required inputs: {}", missing_required.join(", ")),
        );
    }

    let undeclared_outputs: Vec<&str> = outbound
        .iter()
        .copied()
        .filter(|a| !signature.produces(a))
        .collect();
    if !undeclared_outputs.is_empty() {
        return (
            ChainBand::HardMismatch,
            format!("emits undeclared outputs: {}", undeclared_outputs.join(", ")),
        );
    }

    let missing_critical = missing(&signature.critical_optional);
    if !missing_critical.is_empty() {
        return (
            ChainBand::MissingCritical,
            format!("missing critical optional inputs: {}", missing_critical.join(", ")),
        );
    }

    let plain: BTreeSet<String> = signature
        .optional_inputs
        .difference(&signature.critical_optional)
        .cloned()
        .collect();
    let missing_plain = missing(&plain);
    if !plain.is_empty() && missing_plain.len() * 2 > plain.len() {
        return (
            ChainBand::ManyOptionalMissing,
            format!(
                "{} of {} optional inputs missing: {}",
                missing_plain.len(),
                plain.len(),
                missing_plain.join(", ")
            ),
        );
    }

    let unexpected: Vec<&str> = inbound
        .iter()
        .copied()
        .filter(|a| !signature.accepts(a))
        .collect();
    if !missing_plain.is_empty() || !unexpected.is_empty() {
        let mut gaps = Vec::new();
        if !missing_plain.is_empty() {
            gaps.push(format!("optional inputs missing: {}", missing_plain.join(", ")));
        }
        if !unexpected.is_empty() {
            gaps.push(format!("undeclared inputs: {}", unexpected.join(", ")));
        }
        return (ChainBand::MinorGaps, gaps.join("; "));
    }

    (ChainBand::Valid, "all declared inputs and outputs match".to_string())
}
