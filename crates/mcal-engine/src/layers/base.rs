//! `@b`: intrinsic quality of the method artifact.

use mcal_core::{LayerId, LayerScore};

use super::{
    penalize, recover_missing, EvaluationInput, LayerEvaluator, LayerOutcome, UNCALIBRATED_METHOD,
};
use crate::error::EvaluationError;
use crate::evidence::BaseEvidence;

/// Blends theory, implementation and deployment sub-scores with the
/// configured base weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseEvaluator;

impl LayerEvaluator for BaseEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::Base
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<LayerOutcome, EvaluationError> {
        let method = &input.subject.method_id;
        let found = recover_missing(
            LayerId::Base,
            input.evidence.base_scores(method, input.cancel),
        )?;

        let Some(evidence) = found else {
            return penalize(
                input,
                LayerId::Base,
                UNCALIBRATED_METHOD,
                format_args!("no base evidence for '{method}', method is uncalibrated"),
            );
        };

        if let Some((name, value)) = out_of_range(&evidence) {
            return penalize(
                input,
                LayerId::Base,
                UNCALIBRATED_METHOD,
                format_args!(
                    "base evidence for '{method}' has {name} = {value} outside [0,1], \
                     method is uncalibrated"
                ),
            );
        }

        let w = &input.config.layer_parameters().base;
        let score = (w.theory * evidence.theory
            + w.implementation * evidence.implementation
            + w.deployment * evidence.deployment)
            .clamp(0.0, 1.0);

        let rationale = format!(
            "theory {:.3} x {}, implementation {:.3} x {}, deployment {:.3} x {}",
            evidence.theory,
            w.theory,
            evidence.implementation,
            w.implementation,
            evidence.deployment,
            w.deployment
        );
        Ok(LayerOutcome::scored(LayerScore::continuous(
            LayerId::Base,
            score,
            rationale,
        )?))
    }
}

fn out_of_range(evidence: &BaseEvidence) -> Option<(&'static str, f64)> {
    [
        ("theory", evidence.theory),
        ("implementation", evidence.implementation),
        ("deployment", evidence.deployment),
    ]
    .into_iter()
    .find(|(_, v)| !(0.0..=1.0).contains(v))
}
