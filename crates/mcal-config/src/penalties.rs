//! Penalty table (`calibration_penalties.json`).
//!
//! A flat map from penalty key to a score in `[0,1]`. The engine substitutes
//! these scores for layers whose evidence is missing.

use indexmap::IndexMap;

use crate::error::{ConfigValidationError, Document};
use crate::unique::UniqueMap;

/// Validated penalty scores keyed by penalty name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PenaltyTable {
    entries: IndexMap<String, f64>,
}

impl PenaltyTable {
    pub fn from_json(raw: &str) -> Result<Self, ConfigValidationError> {
        let UniqueMap(entries) =
            serde_json::from_str(raw).map_err(|source| ConfigValidationError::Parse {
                document: Document::Penalties,
                source,
            })?;

        for (key, &value) in &entries {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidValue {
                    document: Document::Penalties,
                    key: key.clone(),
                    value,
                    reason: "penalty scores must lie in [0, 1]".to_string(),
                });
            }
        }
        Ok(PenaltyTable { entries })
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        let table = PenaltyTable::from_json(
            r#"{"uncalibrated_method": 0.1, "missing_governance_evidence": 0.3}"#,
        )
        .unwrap();
        assert_eq!(table.get("uncalibrated_method"), Some(0.1));
        assert_eq!(table.get("missing_compatibility_data"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn out_of_range_rejected() {
        let err = PenaltyTable::from_json(r#"{"uncalibrated_method": 1.5}"#).unwrap_err();
        assert!(matches!(err, ConfigValidationError::InvalidValue { .. }));
    }

    #[test]
    fn repeated_key_rejected() {
        let err = PenaltyTable::from_json(
            r#"{"uncalibrated_method": 0.1, "uncalibrated_method": 0.9}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigValidationError::Parse { .. }));
    }

    #[test]
    fn non_numeric_rejected() {
        let err = PenaltyTable::from_json(r#"{"uncalibrated_method": "low"}"#).unwrap_err();
        assert!(matches!(err, ConfigValidationError::Parse { .. }));
    }
}
