//! The configuration store and its shared handle.
//!
//! [`ConfigurationStore`] is immutable once built. Hot reload never mutates a
//! store in place: [`ConfigHandle::load`] builds a fresh store and swaps the
//! shared pointer, so a calibration that already holds an
//! `Arc<ConfigurationStore>` keeps reading the snapshot it started with.
//!
//! # Hashing
//!
//! `config_hash` is a blake3 digest over the raw bytes of the three documents,
//! each prefixed by its file name and length. Two stores with the same hash
//! were built from byte-identical inputs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use mcal_core::LayerId;

use crate::error::{ConfigValidationError, Document};
use crate::penalties::PenaltyTable;
use crate::thresholds::{QualityBand, ThresholdScope, ThresholdTable};
use crate::weights::{AggregationConfig, LayerParameters};

/// Locations of the three configuration documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub weights: PathBuf,
    pub penalties: PathBuf,
    pub thresholds: PathBuf,
}

impl ConfigPaths {
    /// The canonical file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        ConfigPaths {
            weights: dir.join(Document::Weights.file_name()),
            penalties: dir.join(Document::Penalties.file_name()),
            thresholds: dir.join(Document::Thresholds.file_name()),
        }
    }

    fn path(&self, document: Document) -> &Path {
        match document {
            Document::Weights => &self.weights,
            Document::Penalties => &self.penalties,
            Document::Thresholds => &self.thresholds,
        }
    }
}

/// Validated, immutable configuration.
#[derive(Debug, Clone)]
pub struct ConfigurationStore {
    aggregation: AggregationConfig,
    penalties: PenaltyTable,
    thresholds: ThresholdTable,
    config_hash: String,
}

/// Reads, parses and validates all three documents.
///
/// Any failure is returned before a store exists; there is no partially
/// loaded configuration.
pub fn load_configuration(
    paths: &ConfigPaths,
) -> Result<ConfigurationStore, ConfigValidationError> {
    let weights = read(paths, Document::Weights)?;
    let penalties = read(paths, Document::Penalties)?;
    let thresholds = read(paths, Document::Thresholds)?;
    let store = ConfigurationStore::from_documents(&weights, &penalties, &thresholds)?;
    tracing::info!(
        weights = %paths.weights.display(),
        config_hash = %store.config_hash,
        "configuration loaded"
    );
    Ok(store)
}

fn read(paths: &ConfigPaths, document: Document) -> Result<String, ConfigValidationError> {
    let path = paths.path(document);
    fs::read_to_string(path).map_err(|source| ConfigValidationError::Io {
        document,
        path: path.to_path_buf(),
        source,
    })
}

impl ConfigurationStore {
    /// Builds a store from the raw JSON text of each document.
    pub fn from_documents(
        weights: &str,
        penalties: &str,
        thresholds: &str,
    ) -> Result<Self, ConfigValidationError> {
        let aggregation = AggregationConfig::from_json(weights)?;
        let penalty_table = PenaltyTable::from_json(penalties)?;
        let threshold_table = ThresholdTable::from_json(thresholds)?;

        let mut hasher = blake3::Hasher::new();
        for (document, raw) in [
            (Document::Weights, weights),
            (Document::Penalties, penalties),
            (Document::Thresholds, thresholds),
        ] {
            hasher.update(document.file_name().as_bytes());
            hasher.update(&(raw.len() as u64).to_le_bytes());
            hasher.update(raw.as_bytes());
        }

        Ok(ConfigurationStore {
            aggregation,
            penalties: penalty_table,
            thresholds: threshold_table,
            config_hash: hasher.finalize().to_hex().to_string(),
        })
    }

    pub fn aggregation(&self) -> &AggregationConfig {
        &self.aggregation
    }

    pub fn penalties(&self) -> &PenaltyTable {
        &self.penalties
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn layer_parameters(&self) -> &LayerParameters {
        self.aggregation.parameters()
    }

    /// Hex blake3 digest identifying the loaded documents.
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub fn get_linear_weight(&self, layer: LayerId) -> f64 {
        self.aggregation.linear_weight(layer)
    }

    pub fn get_interaction_weight(&self, a: LayerId, b: LayerId) -> f64 {
        self.aggregation.interaction_weight(a, b)
    }

    pub fn get_penalty(&self, key: &str) -> Option<f64> {
        self.penalties.get(key)
    }

    pub fn get_threshold(&self, scope: ThresholdScope, band: QualityBand) -> Option<f64> {
        self.thresholds.get(scope).and_then(|t| t.bound(band))
    }

    pub fn classify(&self, scope: ThresholdScope, score: f64) -> Option<QualityBand> {
        self.thresholds.classify(scope, score)
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Process-wide pointer to the current configuration snapshot.
#[derive(Debug, Default)]
pub struct ConfigHandle {
    current: RwLock<Option<Arc<ConfigurationStore>>>,
}

impl ConfigHandle {
    /// A handle with no configuration installed.
    pub fn empty() -> Self {
        ConfigHandle::default()
    }

    pub fn with_store(store: ConfigurationStore) -> Self {
        ConfigHandle {
            current: RwLock::new(Some(Arc::new(store))),
        }
    }

    /// The current snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<ConfigurationStore>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Installs `store` and returns the snapshot it replaced.
    pub fn install(&self, store: ConfigurationStore) -> Option<Arc<ConfigurationStore>> {
        let next = Arc::new(store);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(next)
    }

    /// Loads from disk and installs on success. On failure the current
    /// snapshot is left untouched.
    pub fn load(
        &self,
        paths: &ConfigPaths,
    ) -> Result<Arc<ConfigurationStore>, ConfigValidationError> {
        let store = load_configuration(paths)?;
        let next = Arc::new(store);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::clone(&next));
        Ok(next)
    }
}
