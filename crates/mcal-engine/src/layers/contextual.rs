//! `@q`, `@d`, `@p`: compatibility of the method with its execution context.
//!
//! One evaluator type serves all three layers, parameterized by
//! [`ContextAxis`]. The band comes straight from the method's compatibility
//! table for the context key:
//!
//! - entry found: that band
//! - table present, no entry: `0`
//! - no table for the axis: the `missing_compatibility_data` penalty, floored
//!   to a band
//! - no question in the context (`Q = ⊥`, question axis only): `0.1`

use mcal_core::{ContextBand, LayerId, LayerScore};

use super::{
    penalize, recover_missing, EvaluationInput, LayerEvaluator, LayerOutcome,
    MISSING_COMPATIBILITY_DATA,
};
use crate::error::EvaluationError;
use crate::evidence::ContextAxis;

#[derive(Debug, Clone, Copy)]
pub struct ContextualEvaluator {
    axis: ContextAxis,
}

impl ContextualEvaluator {
    pub fn new(axis: ContextAxis) -> Self {
        ContextualEvaluator { axis }
    }

    pub fn axis(&self) -> ContextAxis {
        self.axis
    }
}

impl LayerEvaluator for ContextualEvaluator {
    fn layer(&self) -> LayerId {
        self.axis.layer()
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<LayerOutcome, EvaluationError> {
        let layer = self.layer();
        let context = &input.subject.context;
        let key = match self.axis {
            ContextAxis::Question => match &context.question {
                Some(q) => q.as_str(),
                None => {
                    let score = LayerScore::context(
                        layer,
                        ContextBand::Undeclared,
                        "no question in context",
                    )?;
                    return Ok(LayerOutcome::scored(score));
                }
            },
            ContextAxis::Dimension => context.dimension.as_str(),
            ContextAxis::Policy => context.policy_area.as_str(),
        };

        let method = &input.subject.method_id;
        let lookup = input
            .evidence
            .compatibility(method, self.axis, key, input.cancel);
        let Some(entry) = recover_missing(layer, lookup)? else {
            return penalize(
                input,
                layer,
                MISSING_COMPATIBILITY_DATA,
                format_args!("no {} compatibility table for '{method}'", self.axis),
            );
        };

        let score = match entry {
            Some(band) => LayerScore::context(
                layer,
                band,
                format!("{} '{key}' rated {band:?}", self.axis),
            )?,
            None => LayerScore::context(
                layer,
                ContextBand::Incompatible,
                format!("{} '{key}' absent from compatibility table", self.axis),
            )?,
        };
        Ok(LayerOutcome::scored(score))
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

    fn evaluate(
        axis: ContextAxis,
        question: Option<&str>,
        evidence: &InMemoryEvidence,
    ) -> LayerOutcome {
        let store = fixtures::store();
        let (graph, node) = fixtures::lone_node("m");
        let subject = CalibrationSubject::new("m", node, &graph, fixtures::context(question, 1.0));
        let cancel = CancellationToken::new();
        let input = EvaluationInput {
            subject: &subject,
            role: Role::Executor,
            config: &store,
            evidence,
            cancel: &cancel,
        };
        ContextualEvaluator::new(axis).evaluate(&input).unwrap()
    }

    fn evidence() -> InMemoryEvidence {
        let mut evidence = InMemoryEvidence::new();
        evidence
            .with_table("m", ContextAxis::Question, [("Q1".to_string(), ContextBand::Primary)])
            .with_table("m", ContextAxis::Dimension, [("D1".to_string(), ContextBand::Secondary)]);
        evidence
    }

    #[test]
    fn table_entry_gives_band() {
        let outcome = evaluate(ContextAxis::Question, Some("Q1"), &evidence());
        assert_eq!(outcome.score.score(), 1.0);
        assert_eq!(outcome.score.layer, LayerId::Question);

        let outcome = evaluate(ContextAxis::Dimension, None, &evidence());
        assert_eq!(outcome.score.score(), 0.7);
    }

    #[test]
    fn absent_entry_is_zero() {
        let outcome = evaluate(ContextAxis::Question, Some("Q9"), &evidence());
        assert_eq!(outcome.score.score(), 0.0);
        assert!(outcome.penalty.is_none());
    }

    #[test]
    fn undeclared_question() {
        let outcome = evaluate(ContextAxis::Question, None, &evidence());
        assert_eq!(outcome.score.score(), 0.1);
    }

    #[test]
    fn missing_table_is_penalized_to_band() {
        // 0.35 floors to the 0.3 band.
        let outcome = evaluate(ContextAxis::Policy, None, &evidence());
        assert_eq!(outcome.score.score(), 0.3);
        assert_eq!(outcome.score.layer, LayerId::Policy);
        assert_eq!(outcome.penalty.unwrap().key, MISSING_COMPATIBILITY_DATA);
    }
}
