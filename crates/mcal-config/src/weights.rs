//! The aggregation weights document (`choquet_weights.json`).
//!
//! Holds the linear weights `a_ℓ` and the pairwise interaction weights
//! `a_ℓk` of the 2-additive Choquet integral, plus the optional
//! `layer_parameters` blends used inside the `@b` and `@m` evaluators.
//!
//! Validation enforces, in order: every key names a layer exactly once
//! (`b` and `@b` are the same layer), every weight is finite and
//! non-negative, interaction pairs are distinct layers and appear once, and
//! `Σ a_ℓ + Σ a_ℓk = 1` within [`NORMALIZATION_TOLERANCE`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mcal_core::LayerId;

use crate::error::{ConfigValidationError, Document};
use crate::unique::UniqueMap;

/// Allowed deviation of the weight total from 1.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Raw document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeights {
    linear_weights: UniqueMap<RawLinear>,
    #[serde(default)]
    interaction_weights: UniqueMap<RawInteraction>,
    #[serde(default)]
    layer_parameters: LayerParameters,
}

#[derive(Debug, Deserialize)]
struct RawLinear {
    value: f64,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    value: f64,
    layer_pair: [String; 2],
    #[serde(default)]
    rationale: String,
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// A validated linear weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearWeight {
    pub value: f64,
    pub description: String,
}

/// A validated interaction term between two distinct layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionWeight {
    /// Key of the term in the source document (e.g. `"u_chain"`).
    pub key: String,
    /// The pair, stored in canonical layer order.
    pub pair: (LayerId, LayerId),
    pub value: f64,
    pub rationale: String,
}

impl InteractionWeight {
    pub fn involves(&self, a: LayerId, b: LayerId) -> bool {
        self.pair == ordered(a, b)
    }
}

/// Blend weights of the base layer sub-scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaseWeights {
    pub theory: f64,
    pub implementation: f64,
    pub deployment: f64,
}

impl Default for BaseWeights {
    fn default() -> Self {
        BaseWeights {
            theory: 0.4,
            implementation: 0.4,
            deployment: 0.2,
        }
    }
}

/// Blend weights and cost thresholds of the meta layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetaParameters {
    pub transparency: f64,
    pub governance: f64,
    pub cost: f64,
    /// Runtimes below this many seconds count as fast.
    pub fast_runtime_s: f64,
    /// Runtimes below this many seconds count as acceptable.
    pub acceptable_runtime_s: f64,
}

impl Default for MetaParameters {
    fn default() -> Self {
        MetaParameters {
            transparency: 0.5,
            governance: 0.4,
            cost: 0.1,
            fast_runtime_s: 1.0,
            acceptable_runtime_s: 5.0,
        }
    }
}

/// Parameters consumed inside individual evaluators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerParameters {
    pub base: BaseWeights,
    pub meta: MetaParameters,
}

/// The validated aggregation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    linear: BTreeMap<LayerId, LinearWeight>,
    interactions: Vec<InteractionWeight>,
    parameters: LayerParameters,
}

impl AggregationConfig {
    /// Parses and validates a weights document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigValidationError> {
        let doc: RawWeights = serde_json::from_str(raw).map_err(|source| {
            ConfigValidationError::Parse {
                document: Document::Weights,
                source,
            }
        })?;

        let mut linear = BTreeMap::new();
        for (key, entry) in doc.linear_weights {
            let layer = parse_layer(&key)?;
            check_weight(&key, entry.value)?;
            let weight = LinearWeight {
                value: entry.value,
                description: entry.description,
            };
            if linear.insert(layer, weight).is_some() {
                return Err(ConfigValidationError::DuplicateLayer {
                    document: Document::Weights,
                    key,
                    layer,
                });
            }
        }

        let mut interactions: Vec<InteractionWeight> = Vec::new();
        for (key, entry) in doc.interaction_weights {
            let a = parse_layer(&entry.layer_pair[0])?;
            let b = parse_layer(&entry.layer_pair[1])?;
            if a == b {
                return Err(ConfigValidationError::DegenerateInteraction {
                    key,
                    reason: format!("pairs {a} with itself"),
                });
            }
            check_weight(&key, entry.value)?;
            let pair = ordered(a, b);
            if let Some(existing) = interactions.iter().find(|i| i.pair == pair) {
                return Err(ConfigValidationError::DegenerateInteraction {
                    key,
                    reason: format!("duplicates pair already declared by '{}'", existing.key),
                });
            }
            interactions.push(InteractionWeight {
                key,
                pair,
                value: entry.value,
                rationale: entry.rationale,
            });
        }

        validate_parameters(&doc.layer_parameters)?;

        let config = AggregationConfig {
            linear,
            interactions,
            parameters: doc.layer_parameters,
        };

        let sum = config.total_weight();
        if (sum - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(ConfigValidationError::Normalization {
                sum,
                tolerance: NORMALIZATION_TOLERANCE,
            });
        }
        Ok(config)
    }

    /// `a_ℓ`, or 0 when the layer has no configured weight.
    pub fn linear_weight(&self, layer: LayerId) -> f64 {
        self.linear.get(&layer).map_or(0.0, |w| w.value)
    }

    /// `a_ℓk`, order independent, or 0 when the pair is not configured.
    pub fn interaction_weight(&self, a: LayerId, b: LayerId) -> f64 {
        self.interactions
            .iter()
            .find(|i| i.involves(a, b))
            .map_or(0.0, |i| i.value)
    }

    pub fn linear_weights(&self) -> &BTreeMap<LayerId, LinearWeight> {
        &self.linear
    }

    /// Interaction terms in document order.
    pub fn interactions(&self) -> &[InteractionWeight] {
        &self.interactions
    }

    pub fn parameters(&self) -> &LayerParameters {
        &self.parameters
    }

    pub fn linear_total(&self) -> f64 {
        self.linear.values().map(|w| w.value).sum()
    }

    pub fn interaction_total(&self) -> f64 {
        self.interactions.iter().map(|i| i.value).sum()
    }

    /// `Σ a_ℓ + Σ a_ℓk`.
    pub fn total_weight(&self) -> f64 {
        self.linear_total() + self.interaction_total()
    }
}

fn ordered(a: LayerId, b: LayerId) -> (LayerId, LayerId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn parse_layer(key: &str) -> Result<LayerId, ConfigValidationError> {
    key.parse().map_err(|_| ConfigValidationError::UnknownLayer {
        document: Document::Weights,
        key: key.to_string(),
    })
}

fn check_weight(key: &str, value: f64) -> Result<(), ConfigValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigValidationError::InvalidValue {
            document: Document::Weights,
            key: key.to_string(),
            value,
            reason: "weights must be finite and non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_parameters(params: &LayerParameters) -> Result<(), ConfigValidationError> {
    let base = &params.base;
    check_blend(
        "base",
        &[
            ("base.theory", base.theory),
            ("base.implementation", base.implementation),
            ("base.deployment", base.deployment),
        ],
    )?;

    let meta = &params.meta;
    check_blend(
        "meta",
        &[
            ("meta.transparency", meta.transparency),
            ("meta.governance", meta.governance),
            ("meta.cost", meta.cost),
        ],
    )?;

    for (key, value) in [
        ("meta.fast_runtime_s", meta.fast_runtime_s),
        ("meta.acceptable_runtime_s", meta.acceptable_runtime_s),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigValidationError::InvalidValue {
                document: Document::Weights,
                key: key.to_string(),
                value,
                reason: "runtime thresholds must be positive".to_string(),
            });
        }
    }
    if meta.fast_runtime_s >= meta.acceptable_runtime_s {
        return Err(ConfigValidationError::InvalidValue {
            document: Document::Weights,
            key: "meta.fast_runtime_s".to_string(),
            value: meta.fast_runtime_s,
            reason: "must be below meta.acceptable_runtime_s".to_string(),
        });
    }
    Ok(())
}

fn check_blend(group: &'static str, parts: &[(&str, f64)]) -> Result<(), ConfigValidationError> {
    for &(key, value) in parts {
        check_weight(key, value)?;
    }
    let sum: f64 = parts.iter().map(|(_, v)| v).sum();
    if (sum - 1.0).abs() > NORMALIZATION_TOLERANCE {
        return Err(ConfigValidationError::SubWeights { group, sum });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LAYER: &str = r#"{
        "linear_weights": {
            "b": {"value": 0.5, "description": "intrinsic"},
            "@chain": {"value": 0.3, "description": "integration"}
        },
        "interaction_weights": {
            "b_chain": {"value": 0.2, "layer_pair": ["chain", "b"], "rationale": "weakest link"}
        }
    }"#;

    #[test]
    fn accepts_normalized_document() {
        let config = AggregationConfig::from_json(TWO_LAYER).unwrap();
        assert_eq!(config.linear_weight(LayerId::Base), 0.5);
        assert_eq!(config.linear_weight(LayerId::Chain), 0.3);
        assert_eq!(config.linear_weight(LayerId::Meta), 0.0);
        assert_eq!(config.interaction_weight(LayerId::Base, LayerId::Chain), 0.2);
        assert_eq!(config.interaction_weight(LayerId::Chain, LayerId::Base), 0.2);
        assert_eq!(config.interactions()[0].pair, (LayerId::Base, LayerId::Chain));
        assert_eq!(config.parameters(), &LayerParameters::default());
    }

    #[test]
    fn rejects_unknown_layer() {
        let raw = r#"{"linear_weights": {"x": {"value": 1.0}}}"#;
        assert!(matches!(
            AggregationConfig::from_json(raw),
            Err(ConfigValidationError::UnknownLayer { .. })
        ));
    }

    #[test]
    fn rejects_negative_weight() {
        let raw = r#"{"linear_weights": {"b": {"value": 1.2}, "m": {"value": -0.2}}}"#;
        assert!(matches!(
            AggregationConfig::from_json(raw),
            Err(ConfigValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_weight() {
        let raw = r#"{"linear_weights": {"b": {"value": "1.0"}}}"#;
        assert!(matches!(
            AggregationConfig::from_json(raw),
            Err(ConfigValidationError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_aliased_layer_keys() {
        let raw = r#"{"linear_weights": {
            "b": {"value": 0.5},
            "@b": {"value": 0.5},
            "m": {"value": 0.5}
        }}"#;
        match AggregationConfig::from_json(raw) {
            Err(ConfigValidationError::DuplicateLayer { document, key, layer }) => {
                assert_eq!(document, Document::Weights);
                assert_eq!(key, "@b");
                assert_eq!(layer, LayerId::Base);
            }
            other => panic!("expected duplicate layer, got {other:?}"),
        }
    }

    #[test]
    fn rejects_repeated_json_keys() {
        let linear = r#"{"linear_weights": {
            "b": {"value": 0.5},
            "b": {"value": 0.5},
            "m": {"value": 0.5}
        }}"#;
        match AggregationConfig::from_json(linear) {
            Err(ConfigValidationError::Parse { source, .. }) => {
                assert!(source.to_string().contains("duplicate key 'b'"), "{source}")
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        let interaction = r#"{
            "linear_weights": {"b": {"value": 0.6}, "m": {"value": 0.2}},
            "interaction_weights": {
                "b_m": {"value": 0.1, "layer_pair": ["b", "m"]},
                "b_m": {"value": 0.2, "layer_pair": ["b", "m"]}
            }
        }"#;
        assert!(matches!(
            AggregationConfig::from_json(interaction),
            Err(ConfigValidationError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_self_and_duplicate_pairs() {
        let selfie = r#"{
            "linear_weights": {"b": {"value": 0.9}},
            "interaction_weights": {"bb": {"value": 0.1, "layer_pair": ["b", "b"]}}
        }"#;
        assert!(matches!(
            AggregationConfig::from_json(selfie),
            Err(ConfigValidationError::DegenerateInteraction { .. })
        ));

        let duplicate = r#"{
            "linear_weights": {"b": {"value": 0.8}},
            "interaction_weights": {
                "b_m": {"value": 0.1, "layer_pair": ["b", "m"]},
                "m_b": {"value": 0.1, "layer_pair": ["m", "b"]}
            }
        }"#;
        assert!(matches!(
            AggregationConfig::from_json(duplicate),
            Err(ConfigValidationError::DegenerateInteraction { .. })
        ));
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let raw = r#"{"linear_weights": {"b": {"value": 0.6}, "m": {"value": 0.35}}}"#;
        match AggregationConfig::from_json(raw) {
            Err(ConfigValidationError::Normalization { sum, .. }) => {
                assert!((sum - 0.95).abs() < 1e-12)
            }
            other => panic!("expected normalization error, got {other:?}"),
        }
    }

    #[test]
    fn tolerance_admits_rounding_noise() {
        let raw = r#"{"linear_weights": {"b": {"value": 0.3333334}, "m": {"value": 0.6666666}}}"#;
        assert!(AggregationConfig::from_json(raw).is_ok());
    }

    #[test]
    fn layer_parameters_are_validated() {
        let raw = r#"{
            "linear_weights": {"b": {"value": 1.0}},
            "layer_parameters": {"base": {"theory": 0.5, "implementation": 0.5, "deployment": 0.5}}
        }"#;
        assert!(matches!(
            AggregationConfig::from_json(raw),
            Err(ConfigValidationError::SubWeights { group: "base", .. })
        ));

        let inverted = r#"{
            "linear_weights": {"b": {"value": 1.0}},
            "layer_parameters": {"meta": {"fast_runtime_s": 10.0, "acceptable_runtime_s": 5.0}}
        }"#;
        assert!(matches!(
            AggregationConfig::from_json(inverted),
            Err(ConfigValidationError::InvalidValue { .. })
        ));
    }
}
