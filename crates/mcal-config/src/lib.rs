//! Configuration store for the method calibration engine.
//!
//! Loads and validates the three JSON documents that parameterize a
//! calibration run:
//!
//! - [`weights`]: linear and interaction weights of the Choquet aggregator,
//!   plus the blends used inside the base and meta layers
//! - [`penalties`]: scores substituted when evidence is missing
//! - [`thresholds`]: per-layer and final quality bands
//!
//! [`store::ConfigurationStore`] is the validated, immutable result and
//! [`store::ConfigHandle`] the shared pointer swapped on hot reload.

pub mod error;
pub mod penalties;
pub mod store;
pub mod thresholds;
pub mod weights;

mod unique;

// Re-export key types for ergonomic use.
pub use error::{ConfigValidationError, Document};
pub use penalties::PenaltyTable;
pub use store::{load_configuration, ConfigHandle, ConfigPaths, ConfigurationStore};
pub use thresholds::{QualityBand, QualityThresholds, ThresholdScope, ThresholdTable, FINAL_KEY};
pub use weights::{
    AggregationConfig, BaseWeights, InteractionWeight, LayerParameters, LinearWeight,
    MetaParameters, NORMALIZATION_TOLERANCE,
};
