//! The calibration result returned to callers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mcal_config::QualityBand;
use mcal_core::{LayerId, LayerScore, LayerSet, MethodId, NodeId, Role};

use crate::choquet::AggregationBreakdown;
use crate::layers::AppliedPenalty;

/// Outcome of one calibration call. Owned by the caller; never persisted by
/// the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub method_id: MethodId,
    pub role: Role,
    pub node: NodeId,
    pub final_score: f64,
    /// Band of `final_score` under the `"final"` thresholds, when configured.
    pub quality: Option<QualityBand>,
    pub layer_scores: BTreeMap<LayerId, LayerScore>,
    pub breakdown: AggregationBreakdown,
    pub penalties: Vec<AppliedPenalty>,
    pub config_hash: String,
    pub graph_hash: String,
    pub input_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl CalibrationResult {
    /// Layers that were actually evaluated.
    pub fn evaluated_layers(&self) -> LayerSet {
        self.layer_scores.keys().copied().collect()
    }

    pub fn layer_score(&self, layer: LayerId) -> Option<f64> {
        self.layer_scores.get(&layer).map(LayerScore::score)
    }

    pub fn passes(&self, min_score: f64) -> bool {
        self.final_score >= min_score
    }
}
