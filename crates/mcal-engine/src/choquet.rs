//! 2-additive Choquet aggregation.
//!
//! ```text
//! Cal(I) = Σ_{ℓ∈L} a_ℓ · x_ℓ  +  Σ_{(ℓ,k)∈S_int, ℓ,k∈L} a_ℓk · min(x_ℓ, x_k)
//! ```
//!
//! Only the weights of evaluated layers, and of interaction terms whose two
//! layers were both evaluated, are active. The raw sum is divided by the
//! active weight mass, so a role evaluated on a subset of the layers is still
//! scored on `[0,1]`. With every layer evaluated the mass is 1 and the
//! division is a no-op.
//!
//! Every term is non-negative and bounded by its own weight, so the result
//! stays in `[0,1]` and is monotone in each `x_ℓ`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mcal_config::AggregationConfig;
use mcal_core::{LayerId, LayerSet};

use crate::error::EngineError;

/// Contribution of one linear term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTerm {
    pub layer: LayerId,
    pub weight: f64,
    pub normalized_weight: f64,
    pub score: f64,
    pub contribution: f64,
}

/// Contribution of one active interaction term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTerm {
    pub key: String,
    pub pair: (LayerId, LayerId),
    pub weight: f64,
    pub normalized_weight: f64,
    pub scores: (f64, f64),
    pub min: f64,
    pub contribution: f64,
}

/// Full accounting of an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBreakdown {
    pub linear: Vec<LinearTerm>,
    pub interactions: Vec<InteractionTerm>,
    /// Weighted sum before renormalization.
    pub raw_total: f64,
    /// Total of the active weights.
    pub active_weight: f64,
    pub final_score: f64,
    /// Gain in the final score if the layer scored 1.0 instead.
    pub sensitivity: BTreeMap<LayerId, f64>,
}

/// Aggregates layer scores with the weights of one configuration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ChoquetAggregator<'a> {
    config: &'a AggregationConfig,
}

impl<'a> ChoquetAggregator<'a> {
    pub fn new(config: &'a AggregationConfig) -> Self {
        ChoquetAggregator { config }
    }

    /// Aggregates `scores`, which must already lie in `[0,1]`.
    pub fn aggregate(
        &self,
        scores: &BTreeMap<LayerId, f64>,
    ) -> Result<AggregationBreakdown, EngineError> {
        let (raw_total, active_weight) = self.weighted_sum(scores);
        if active_weight <= 0.0 {
            return Err(EngineError::NoActiveWeights {
                layers: scores.keys().copied().collect::<LayerSet>(),
            });
        }
        let final_score = normalize(raw_total, active_weight);

        let linear = scores
            .iter()
            .map(|(&layer, &score)| {
                let weight = self.config.linear_weight(layer);
                LinearTerm {
                    layer,
                    weight,
                    normalized_weight: weight / active_weight,
                    score,
                    contribution: weight * score / active_weight,
                }
            })
            .collect();

        let interactions = self
            .config
            .interactions()
            .iter()
            .filter_map(|term| {
                let (a, b) = term.pair;
                let (&xa, &xb) = (scores.get(&a)?, scores.get(&b)?);
                let min = xa.min(xb);
                Some(InteractionTerm {
                    key: term.key.clone(),
                    pair: term.pair,
                    weight: term.value,
                    normalized_weight: term.value / active_weight,
                    scores: (xa, xb),
                    min,
                    contribution: term.value * min / active_weight,
                })
            })
            .collect();

        let sensitivity = scores
            .keys()
            .map(|&layer| {
                let mut raised = scores.clone();
                raised.insert(layer, 1.0);
                let (raw, mass) = self.weighted_sum(&raised);
                (layer, (normalize(raw, mass) - final_score).max(0.0))
            })
            .collect();

        tracing::debug!(raw_total, active_weight, final_score, "choquet aggregation");
        Ok(AggregationBreakdown {
            linear,
            interactions,
            raw_total,
            active_weight,
            final_score,
            sensitivity,
        })
    }

    /// Raw Choquet sum and active weight mass over the evaluated layers.
    fn weighted_sum(&self, scores: &BTreeMap<LayerId, f64>) -> (f64, f64) {
        let mut raw = 0.0;
        let mut mass = 0.0;
        for (&layer, &x) in scores {
            let weight = self.config.linear_weight(layer);
            raw += weight * x;
            mass += weight;
        }
        for term in self.config.interactions() {
            let (a, b) = term.pair;
            if let (Some(&xa), Some(&xb)) = (scores.get(&a), scores.get(&b)) {
                raw += term.value * xa.min(xb);
                mass += term.value;
            }
        }
        (raw, mass)
    }
}

fn normalize(raw: f64, mass: f64) -> f64 {
    (raw / mass).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEIGHTS: &str = r#"{
        "linear_weights": {
            "b": {"value": 0.122951}, "u": {"value": 0.098361}, "q": {"value": 0.081967},
            "d": {"value": 0.065574}, "p": {"value": 0.049180}, "C": {"value": 0.081967},
            "chain": {"value": 0.065574}, "m": {"value": 0.034426}
        },
        "interaction_weights": {
            "u_chain": {"value": 0.15, "layer_pair": ["u", "chain"]},
            "chain_C": {"value": 0.12, "layer_pair": ["chain", "C"]},
            "q_d": {"value": 0.08, "layer_pair": ["q", "d"]},
            "d_p": {"value": 0.05, "layer_pair": ["d", "p"]}
        }
    }"#;

    fn config() -> AggregationConfig {
        AggregationConfig::from_json(WEIGHTS).unwrap()
    }

    fn scores(pairs: &[(LayerId, f64)]) -> BTreeMap<LayerId, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn subset_without_interactions_is_weighted_average() {
        let config = config();
        let agg = ChoquetAggregator::new(&config);
        let s = scores(&[(LayerId::Base, 0.5), (LayerId::Chain, 1.0), (LayerId::Meta, 0.8)]);
        let result = agg.aggregate(&s).unwrap();

        let mass = 0.122951 + 0.065574 + 0.034426;
        let expected = (0.122951 * 0.5 + 0.065574 * 1.0 + 0.034426 * 0.8) / mass;
        assert!((result.final_score - expected).abs() < 1e-12);
        assert!(result.interactions.is_empty());
        assert!((result.active_weight - mass).abs() < 1e-12);
    }

    #[test]
    fn perfect_subset_scores_one() {
        let config = config();
        let agg = ChoquetAggregator::new(&config);
        let s = scores(&[(LayerId::Base, 1.0), (LayerId::Chain, 1.0), (LayerId::Meta, 1.0)]);
        assert_eq!(agg.aggregate(&s).unwrap().final_score, 1.0);
    }

    #[test]
    fn interaction_uses_weaker_layer() {
        let config = config();
        let agg = ChoquetAggregator::new(&config);
        let all: BTreeMap<LayerId, f64> = LayerId::ALL.iter().map(|&l| (l, 1.0)).collect();
        let mut weak_unit = all.clone();
        weak_unit.insert(LayerId::Unit, 0.0);

        let result = agg.aggregate(&weak_unit).unwrap();
        let u_chain = result
            .interactions
            .iter()
            .find(|t| t.key == "u_chain")
            .unwrap();
        assert_eq!(u_chain.min, 0.0);
        assert_eq!(u_chain.contribution, 0.0);
        // a_u + a_u_chain lost out of a total mass of 1.
        assert!((result.final_score - (1.0 - 0.098361 - 0.15)).abs() < 1e-6);
        assert!((result.active_weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sensitivity_reports_headroom() {
        let config = config();
        let agg = ChoquetAggregator::new(&config);
        let s = scores(&[(LayerId::Base, 0.0), (LayerId::Chain, 1.0), (LayerId::Meta, 1.0)]);
        let result = agg.aggregate(&s).unwrap();
        assert_eq!(result.sensitivity[&LayerId::Chain], 0.0);
        let mass = 0.122951 + 0.065574 + 0.034426;
        assert!((result.sensitivity[&LayerId::Base] - 0.122951 / mass).abs() < 1e-12);
    }

    #[test]
    fn no_active_weight_is_an_error() {
        let config = AggregationConfig::from_json(r#"{"linear_weights": {"b": {"value": 1.0}}}"#)
            .unwrap();
        let agg = ChoquetAggregator::new(&config);
        let err = agg.aggregate(&scores(&[(LayerId::Meta, 1.0)])).unwrap_err();
        assert!(matches!(err, EngineError::NoActiveWeights { .. }));
    }
}
