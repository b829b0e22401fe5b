//! Configuration error types for mcal-config.
//!
//! [`ConfigValidationError`] covers every way a configuration document can be
//! rejected: unreadable files, malformed JSON, unknown layer names, values
//! outside their domain, and violations of the normalization constraint.
//! All of them are fatal at startup.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use mcal_core::LayerId;

/// The three configuration documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    Weights,
    Penalties,
    Thresholds,
}

impl Document {
    /// Canonical file name of the document inside a configuration directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Document::Weights => "choquet_weights.json",
            Document::Penalties => "calibration_penalties.json",
            Document::Thresholds => "quality_thresholds.json",
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    /// A document could not be read from disk.
    #[error("failed to read {document} from {path}: {source}", path = path.display())]
    Io {
        document: Document,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document is not valid JSON or has the wrong shape or field types.
    #[error("failed to parse {document}: {source}")]
    Parse {
        document: Document,
        #[source]
        source: serde_json::Error,
    },

    /// A key does not name one of the eight layers.
    #[error("{document}: unknown layer '{key}'")]
    UnknownLayer { document: Document, key: String },

    /// A numeric value lies outside its legal domain.
    #[error("{document}: '{key}' has invalid value {value}: {reason}")]
    InvalidValue {
        document: Document,
        key: String,
        value: f64,
        reason: String,
    },

    /// Two keys of one table resolve to the same layer, e.g. `b` and `@b`.
    #[error("{document}: '{key}' names layer {layer} a second time")]
    DuplicateLayer {
        document: Document,
        key: String,
        layer: LayerId,
    },

    /// Linear plus interaction weights do not sum to one.
    #[error("weights sum to {sum}, expected 1 within {tolerance}")]
    Normalization { sum: f64, tolerance: f64 },

    /// An interaction term pairs a layer with itself or repeats a pair.
    #[error("interaction '{key}': {reason}")]
    DegenerateInteraction { key: String, reason: String },

    /// Quality thresholds are not ordered excellent ≥ good ≥ acceptable ≥ needs_improvement.
    #[error("{document}: thresholds for '{key}' are not monotonically ordered")]
    ThresholdOrder { document: Document, key: String },

    /// A layer-parameter blend does not sum to one.
    #[error("layer parameters '{group}' sum to {sum}, expected 1")]
    SubWeights { group: &'static str, sum: f64 },
}
