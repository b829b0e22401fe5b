//! Quality thresholds (`quality_thresholds.json`).
//!
//! Each entry is keyed by a layer name or by `"final"` for the aggregate
//! score, and maps quality bands to lower bounds.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use mcal_core::LayerId;

use crate::error::{ConfigValidationError, Document};
use crate::unique::UniqueMap;

/// Key used for the thresholds that apply to the final score.
pub const FINAL_KEY: &str = "final";

/// Quality label assigned to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    /// Below every configured bound.
    Insufficient,
    NeedsImprovement,
    Acceptable,
    Good,
    Excellent,
}

impl QualityBand {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityBand::Insufficient => "insufficient",
            QualityBand::NeedsImprovement => "needs_improvement",
            QualityBand::Acceptable => "acceptable",
            QualityBand::Good => "good",
            QualityBand::Excellent => "excellent",
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a threshold entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThresholdScope {
    Layer(LayerId),
    Final,
}

impl fmt::Display for ThresholdScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdScope::Layer(layer) => write!(f, "{layer}"),
            ThresholdScope::Final => f.write_str(FINAL_KEY),
        }
    }
}

/// Lower bounds of each band for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityThresholds {
    pub excellent: f64,
    pub good: f64,
    pub acceptable: f64,
    pub needs_improvement: f64,
}

impl QualityThresholds {
    pub fn bound(&self, band: QualityBand) -> Option<f64> {
        match band {
            QualityBand::Excellent => Some(self.excellent),
            QualityBand::Good => Some(self.good),
            QualityBand::Acceptable => Some(self.acceptable),
            QualityBand::NeedsImprovement => Some(self.needs_improvement),
            QualityBand::Insufficient => None,
        }
    }

    pub fn classify(&self, score: f64) -> QualityBand {
        if score >= self.excellent {
            QualityBand::Excellent
        } else if score >= self.good {
            QualityBand::Good
        } else if score >= self.acceptable {
            QualityBand::Acceptable
        } else if score >= self.needs_improvement {
            QualityBand::NeedsImprovement
        } else {
            QualityBand::Insufficient
        }
    }

    fn is_ordered(&self) -> bool {
        let bounds = [
            1.0,
            self.excellent,
            self.good,
            self.acceptable,
            self.needs_improvement,
            0.0,
        ];
        bounds.windows(2).all(|w| w[0] >= w[1])
    }
}

/// Validated thresholds for every configured scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdTable {
    entries: BTreeMap<ThresholdScope, QualityThresholds>,
}

impl ThresholdTable {
    pub fn from_json(raw: &str) -> Result<Self, ConfigValidationError> {
        let doc: UniqueMap<QualityThresholds> =
            serde_json::from_str(raw).map_err(|source| ConfigValidationError::Parse {
                document: Document::Thresholds,
                source,
            })?;

        let mut entries = BTreeMap::new();
        for (key, thresholds) in doc {
            let scope = if key == FINAL_KEY {
                ThresholdScope::Final
            } else {
                let layer = key.parse().map_err(|_| ConfigValidationError::UnknownLayer {
                    document: Document::Thresholds,
                    key: key.clone(),
                })?;
                ThresholdScope::Layer(layer)
            };
            if !thresholds.is_ordered() {
                return Err(ConfigValidationError::ThresholdOrder {
                    document: Document::Thresholds,
                    key,
                });
            }
            if entries.insert(scope, thresholds).is_some() {
                if let ThresholdScope::Layer(layer) = scope {
                    return Err(ConfigValidationError::DuplicateLayer {
                        document: Document::Thresholds,
                        key,
                        layer,
                    });
                }
            }
        }
        Ok(ThresholdTable { entries })
    }

    pub fn get(&self, scope: ThresholdScope) -> Option<&QualityThresholds> {
        self.entries.get(&scope)
    }

    /// Classifies `score` against the scope's thresholds, if any are configured.
    pub fn classify(&self, scope: ThresholdScope, score: f64) -> Option<QualityBand> {
        self.get(scope).map(|t| t.classify(score))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "b": {"excellent": 0.9, "good": 0.75, "acceptable": 0.6, "needs_improvement": 0.4},
        "final": {"excellent": 0.85, "good": 0.7, "acceptable": 0.55, "needs_improvement": 0.3}
    }"#;

    #[test]
    fn parses_layers_and_final() {
        let table = ThresholdTable::from_json(DOC).unwrap();
        assert_eq!(table.len(), 2);
        let base = table.get(ThresholdScope::Layer(LayerId::Base)).unwrap();
        assert_eq!(base.bound(QualityBand::Good), Some(0.75));
        assert_eq!(base.bound(QualityBand::NeedsImprovement), Some(0.4));
        assert_eq!(base.bound(QualityBand::Insufficient), None);
        assert!(table.get(ThresholdScope::Layer(LayerId::Meta)).is_none());
    }

    #[test]
    fn classification_bands() {
        let table = ThresholdTable::from_json(DOC).unwrap();
        let classify = |s| table.classify(ThresholdScope::Final, s);
        assert_eq!(classify(0.9), Some(QualityBand::Excellent));
        assert_eq!(classify(0.85), Some(QualityBand::Excellent));
        assert_eq!(classify(0.72), Some(QualityBand::Good));
        assert_eq!(classify(0.6), Some(QualityBand::Acceptable));
        assert_eq!(classify(0.4), Some(QualityBand::NeedsImprovement));
        assert_eq!(classify(0.1), Some(QualityBand::Insufficient));
        assert_eq!(table.classify(ThresholdScope::Layer(LayerId::Unit), 0.5), None);
    }

    #[test]
    fn every_band_bound_is_required() {
        let raw = r#"{"final": {"excellent": 0.85, "good": 0.7, "acceptable": 0.55}}"#;
        match ThresholdTable::from_json(raw) {
            Err(ConfigValidationError::Parse { source, .. }) => {
                assert!(source.to_string().contains("needs_improvement"), "{source}")
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let raw = r#"{
            "u": {"excellent": 0.6, "good": 0.7, "acceptable": 0.5, "needs_improvement": 0.3}
        }"#;
        assert!(matches!(
            ThresholdTable::from_json(raw),
            Err(ConfigValidationError::ThresholdOrder { .. })
        ));

        let above_one = r#"{
            "u": {"excellent": 1.2, "good": 0.7, "acceptable": 0.5, "needs_improvement": 0.3}
        }"#;
        assert!(matches!(
            ThresholdTable::from_json(above_one),
            Err(ConfigValidationError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn unknown_scope_rejected() {
        let raw = r#"{
            "overall": {"excellent": 0.9, "good": 0.7, "acceptable": 0.5, "needs_improvement": 0.3}
        }"#;
        assert!(matches!(
            ThresholdTable::from_json(raw),
            Err(ConfigValidationError::UnknownLayer { .. })
        ));
    }

    #[test]
    fn aliased_layer_keys_rejected() {
        let raw = r#"{
            "u": {"excellent": 0.9, "good": 0.7, "acceptable": 0.5, "needs_improvement": 0.3},
            "@u": {"excellent": 0.8, "good": 0.6, "acceptable": 0.4, "needs_improvement": 0.2}
        }"#;
        match ThresholdTable::from_json(raw) {
            Err(ConfigValidationError::DuplicateLayer { key, layer, .. }) => {
                assert_eq!(key, "@u");
                assert_eq!(layer, LayerId::Unit);
            }
            other => panic!("expected duplicate layer, got {other:?}"),
        }
    }
}
