//! `@u`: sensitivity to the structural quality of the unit of analysis.

use mcal_core::{LayerId, LayerScore};

use super::{EvaluationInput, LayerEvaluator, LayerOutcome};
use crate::error::EvaluationError;
use crate::requirements::role_profile;

/// Applies the role's [`UnitTransform`](crate::requirements::UnitTransform) to `ctx.U`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitEvaluator;

impl LayerEvaluator for UnitEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::Unit
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<LayerOutcome, EvaluationError> {
        let transform = role_profile(input.role).unit_transform;
        let u = input.subject.context.unit_quality;

        let rationale = if transform.is_sensitive() {
            format!("{} transform of unit quality {u:.3}", transform.as_str())
        } else {
            format!("role {} is not structure-sensitive", input.role)
        };
        let score = LayerScore::continuous(LayerId::Unit, transform.apply(u), rationale)?;
        Ok(LayerOutcome::scored(score))
    }
}
