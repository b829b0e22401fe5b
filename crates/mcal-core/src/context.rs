//! The execution context `ctx = (Q, D, P, U)` a method is calibrated in.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Execution context of a calibration subject.
///
/// `unit_quality` is validated to lie in `[0,1]` on construction and on
/// deserialization, so every `ContextTuple` in circulation is legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContext")]
pub struct ContextTuple {
    /// `Q`: question id, or `None` when the method runs outside any question.
    pub question: Option<String>,
    /// `D`: analytical dimension id.
    pub dimension: String,
    /// `P`: policy area id.
    pub policy_area: String,
    /// `U`: externally supplied structural quality of the unit of analysis.
    pub unit_quality: f64,
}

#[derive(Deserialize)]
struct RawContext {
    #[serde(default)]
    question: Option<String>,
    dimension: String,
    policy_area: String,
    unit_quality: f64,
}

impl TryFrom<RawContext> for ContextTuple {
    type Error = CoreError;

    fn try_from(raw: RawContext) -> Result<Self, Self::Error> {
        ContextTuple::new(raw.question, raw.dimension, raw.policy_area, raw.unit_quality)
    }
}

impl ContextTuple {
    pub fn new(
        question: Option<String>,
        dimension: impl Into<String>,
        policy_area: impl Into<String>,
        unit_quality: f64,
    ) -> Result<Self, CoreError> {
        if !(0.0..=1.0).contains(&unit_quality) {
            return Err(CoreError::InvalidContext {
                reason: format!("unit_quality must be in [0,1], got {unit_quality}"),
            });
        }
        let dimension = dimension.into();
        let policy_area = policy_area.into();
        if dimension.trim().is_empty() || policy_area.trim().is_empty() {
            return Err(CoreError::InvalidContext {
                reason: "dimension and policy_area must be non-empty".to_string(),
            });
        }
        Ok(ContextTuple {
            question,
            dimension,
            policy_area,
            unit_quality,
        })
    }
}
