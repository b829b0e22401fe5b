//! Method calibration engine.
//!
//! Scores a method instance inside a computation graph on up to eight
//! quality layers and fuses the layer scores with a 2-additive Choquet
//! integral.
//!
//! # Architecture
//!
//! Data flows leaf-first:
//!
//! ```text
//! CalibrationSubject -> required_layers(role) -> LayerEvaluator*
//!     -> ChoquetAggregator -> CalibrationResult
//! ```
//!
//! Configuration comes from an immutable
//! [`ConfigurationStore`](mcal_config::ConfigurationStore) snapshot taken at
//! the start of each call. Evidence comes from an injected
//! [`EvidenceProvider`]. Nothing is mutated during a calibration, so
//! concurrent calls need no locking beyond the snapshot read.
//!
//! # Modules
//!
//! - [`error`]: evidence, evaluation and engine errors
//! - [`cancel`]: cancellation token with optional deadline
//! - [`clock`]: injected timestamp source
//! - [`evidence`]: the evidence provider trait and an in-memory provider
//! - [`subject`]: the calibration subject
//! - [`requirements`]: role to required-layer table
//! - [`layers`]: the eight layer evaluators
//! - [`choquet`]: the aggregator and its breakdown
//! - [`hash`]: blake3 audit hashes
//! - [`result`]: the calibration result
//! - [`orchestrator`]: the coordination point
//! - [`enforce`]: call-site enforcement wrapper

pub mod cancel;
pub mod choquet;
pub mod clock;
pub mod enforce;
pub mod error;
pub mod evidence;
pub mod hash;
pub mod layers;
pub mod orchestrator;
pub mod requirements;
pub mod result;
pub mod subject;

// Re-export key types for ergonomic use.
pub use cancel::CancellationToken;
pub use choquet::{AggregationBreakdown, ChoquetAggregator, InteractionTerm, LinearTerm};
pub use clock::{Clock, FixedClock, SystemClock};
pub use enforce::{enforce, CalibrationEnforcementError, EnforcementPolicy, Guarded};
pub use error::{EngineError, EvaluationError, EvidenceError, EvidenceKind};
pub use evidence::{
    BaseEvidence, CompatibilityTables, ContextAxis, EvidenceProvider, GovernanceEvidence,
    InMemoryEvidence, InterplayProfile,
};
pub use layers::{AppliedPenalty, EvaluationInput, EvaluatorSet, LayerEvaluator, LayerOutcome};
pub use orchestrator::{CalibrationOrchestrator, CalibrationRequest, EngineState};
pub use requirements::{required_layers, role_profile, role_table, RoleProfile, UnitTransform};
pub use result::CalibrationResult;
pub use subject::CalibrationSubject;
