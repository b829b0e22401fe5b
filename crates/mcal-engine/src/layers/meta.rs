//! `@m`: transparency, governance and cost disclosure.

use mcal_config::MetaParameters;
use mcal_core::{LayerId, LayerScore};

use super::{
    penalize, recover_missing, EvaluationInput, LayerEvaluator, LayerOutcome,
    MISSING_GOVERNANCE_EVIDENCE,
};
use crate::error::EvaluationError;
use crate::evidence::GovernanceEvidence;

const TRANSPARENCY_STEPS: [f64; 4] = [0.0, 0.4, 0.7, 1.0];
const GOVERNANCE_STEPS: [f64; 4] = [0.0, 0.33, 0.66, 1.0];

/// Score given to a method whose runtime is unknown.
const UNKNOWN_RUNTIME: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default)]
pub struct MetaEvaluator;

impl LayerEvaluator for MetaEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::Meta
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<LayerOutcome, EvaluationError> {
        let method = &input.subject.method_id;
        let lookup = input.evidence.governance(method, input.cancel);
        let Some(evidence) = recover_missing(LayerId::Meta, lookup)? else {
            return penalize(
                input,
                LayerId::Meta,
                MISSING_GOVERNANCE_EVIDENCE,
                format_args!("no governance evidence for '{method}'"),
            );
        };

        let params = &input.config.layer_parameters().meta;
        let transparency = transparency(&evidence);
        let governance = governance(&evidence);
        let cost = cost(evidence.runtime_s, params);
        let score = (params.transparency * transparency
            + params.governance * governance
            + params.cost * cost)
            .clamp(0.0, 1.0);

        let rationale = format!(
            "transparency {transparency}, governance {governance}, cost {cost} blended {}/{}/{}",
            params.transparency, params.governance, params.cost
        );
        Ok(LayerOutcome::scored(LayerScore::continuous(
            LayerId::Meta,
            score,
            rationale,
        )?))
    }
}

fn count(flags: [bool; 3]) -> usize {
    flags.into_iter().filter(|f| *f).count()
}

fn transparency(e: &GovernanceEvidence) -> f64 {
    TRANSPARENCY_STEPS[count([e.formula_exported, e.full_trace, e.logs_conform])]
}

fn governance(e: &GovernanceEvidence) -> f64 {
    GOVERNANCE_STEPS[count([e.version_tagged, e.config_hash_matches, e.signature_valid])]
}

fn cost(runtime_s: Option<f64>, params: &MetaParameters) -> f64 {
    match runtime_s {
        None => UNKNOWN_RUNTIME,
        Some(t) if !t.is_finite() || t < 0.0 => 0.0,
        Some(t) if t < params.fast_runtime_s => 1.0,
        Some(t) if t < params.acceptable_runtime_s => 0.8,
        Some(_) => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::evidence::InMemoryEvidence;
    use crate::layers::fixtures;
    use crate::subject::CalibrationSubject;
    use mcal_core::Role;

    fn evaluate(evidence: &InMemoryEvidence) -> LayerOutcome {
        let store = fixtures::store();
        let (graph, node) = fixtures::lone_node("m");
        let subject = CalibrationSubject::new("m", node, &graph, fixtures::context(None, 1.0));
        let cancel = CancellationToken::new();
        let input = EvaluationInput {
            subject: &subject,
            role: Role::MetaTool,
            config: &store,
            evidence,
            cancel: &cancel,
        };
        MetaEvaluator.evaluate(&input).unwrap()
    }

    #[test]
    fn fully_disclosed_fast_method() {
        let mut evidence = InMemoryEvidence::new();
        evidence.with_governance(
            "m",
            GovernanceEvidence {
                formula_exported: true,
                full_trace: true,
                logs_conform: true,
                version_tagged: true,
                config_hash_matches: true,
                signature_valid: true,
                runtime_s: Some(0.2),
            },
        );
        assert!((evaluate(&evidence).score.score() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn partial_disclosure() {
        let mut evidence = InMemoryEvidence::new();
        evidence.with_governance(
            "m",
            GovernanceEvidence {
                formula_exported: true,
                full_trace: true,
                version_tagged: true,
                runtime_s: Some(3.0),
                ..GovernanceEvidence::default()
            },
        );
        // 0.5 * 0.7 + 0.4 * 0.33 + 0.1 * 0.8
        let expected = 0.35 + 0.132 + 0.08;
        assert!((evaluate(&evidence).score.score() - expected).abs() < 1e-12);
    }

    #[test]
    fn cost_bands() {
        let params = MetaParameters::default();
        assert_eq!(cost(None, &params), 0.5);
        assert_eq!(cost(Some(-1.0), &params), 0.0);
        assert_eq!(cost(Some(0.5), &params), 1.0);
        assert_eq!(cost(Some(1.0), &params), 0.8);
        assert_eq!(cost(Some(5.0), &params), 0.5);
    }

    #[test]
    fn missing_governance_is_penalized() {
        let mut evidence = InMemoryEvidence::new();
        evidence.register("m");
        let outcome = evaluate(&evidence);
        assert_eq!(outcome.score.score(), 0.3);
        assert_eq!(outcome.penalty.unwrap().key, MISSING_GOVERNANCE_EVIDENCE);
    }
}
