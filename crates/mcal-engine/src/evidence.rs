//! Evidence collaborators.
//!
//! The engine never decides what evidence exists. It asks an injected
//! [`EvidenceProvider`] for base-layer sub-scores, governance facts,
//! compatibility bands and interplay profiles, and turns a
//! [`EvidenceError::Missing`] answer into a penalty score.
//!
//! [`InMemoryEvidence`] is the reference provider: a plain map per evidence
//! kind, deserializable from JSON, used by tests and the `mcal` binary.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use mcal_core::{ContextBand, LayerId, MethodId};

use crate::cancel::CancellationToken;
use crate::error::{EvidenceError, EvidenceKind};

/// One of the three contextual compatibility axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextAxis {
    Question,
    Dimension,
    Policy,
}

impl ContextAxis {
    pub const ALL: [ContextAxis; 3] = [
        ContextAxis::Question,
        ContextAxis::Dimension,
        ContextAxis::Policy,
    ];

    /// The layer scored along this axis.
    pub fn layer(self) -> LayerId {
        match self {
            ContextAxis::Question => LayerId::Question,
            ContextAxis::Dimension => LayerId::Dimension,
            ContextAxis::Policy => LayerId::Policy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContextAxis::Question => "question",
            ContextAxis::Dimension => "dimension",
            ContextAxis::Policy => "policy",
        }
    }
}

impl fmt::Display for ContextAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Evidence records
// ---------------------------------------------------------------------------

/// Sub-scores of the base layer, each expected in `[0,1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseEvidence {
    pub theory: f64,
    pub implementation: f64,
    pub deployment: f64,
}

/// Governance and disclosure facts consumed by the meta layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceEvidence {
    pub formula_exported: bool,
    pub full_trace: bool,
    pub logs_conform: bool,
    pub version_tagged: bool,
    pub config_hash_matches: bool,
    pub signature_valid: bool,
    /// Observed runtime in seconds, if disclosed.
    pub runtime_s: Option<f64>,
}

/// What the congruence layer needs to know about one interplay member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterplayProfile {
    /// Declared numeric range of the method's output.
    pub output_range: (f64, f64),
    #[serde(default)]
    pub semantic_tags: BTreeSet<String>,
}

/// Compatibility tables of one method, one per axis.
///
/// A `None` axis means the method has no table for it at all, which is
/// different from a table that lacks an entry for a given key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityTables {
    pub question: Option<BTreeMap<String, ContextBand>>,
    pub dimension: Option<BTreeMap<String, ContextBand>>,
    pub policy: Option<BTreeMap<String, ContextBand>>,
}

impl CompatibilityTables {
    pub fn axis(&self, axis: ContextAxis) -> Option<&BTreeMap<String, ContextBand>> {
        match axis {
            ContextAxis::Question => self.question.as_ref(),
            ContextAxis::Dimension => self.dimension.as_ref(),
            ContextAxis::Policy => self.policy.as_ref(),
        }
    }

    fn axis_mut(&mut self, axis: ContextAxis) -> &mut Option<BTreeMap<String, ContextBand>> {
        match axis {
            ContextAxis::Question => &mut self.question,
            ContextAxis::Dimension => &mut self.dimension,
            ContextAxis::Policy => &mut self.policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Source of calibration evidence.
///
/// Implementations may block on I/O. They receive the caller's
/// [`CancellationToken`] and should return [`EvidenceError::Cancelled`] once it
/// fires; retries and backoff are theirs to handle.
pub trait EvidenceProvider: Send + Sync {
    /// Whether the method is known to the registry at all.
    fn is_registered(&self, method: &MethodId) -> bool;

    fn base_scores(
        &self,
        method: &MethodId,
        cancel: &CancellationToken,
    ) -> Result<BaseEvidence, EvidenceError>;

    fn governance(
        &self,
        method: &MethodId,
        cancel: &CancellationToken,
    ) -> Result<GovernanceEvidence, EvidenceError>;

    /// `Err(Missing)` when the method has no table for `axis`; `Ok(None)` when
    /// the table exists but has no entry for `key`.
    fn compatibility(
        &self,
        method: &MethodId,
        axis: ContextAxis,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ContextBand>, EvidenceError>;

    fn interplay_profile(
        &self,
        method: &MethodId,
        cancel: &CancellationToken,
    ) -> Result<InterplayProfile, EvidenceError>;
}

// ---------------------------------------------------------------------------
// In-memory provider
// ---------------------------------------------------------------------------

/// Evidence held in memory, keyed by method id.
///
/// A method counts as registered if it is listed in `methods` or has any
/// evidence record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryEvidence {
    pub methods: BTreeSet<MethodId>,
    pub base: BTreeMap<MethodId, BaseEvidence>,
    pub governance: BTreeMap<MethodId, GovernanceEvidence>,
    pub compatibility: BTreeMap<MethodId, CompatibilityTables>,
    pub interplay: BTreeMap<MethodId, InterplayProfile>,
}

impl InMemoryEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a method without attaching any evidence.
    pub fn register(&mut self, method: impl Into<MethodId>) -> &mut Self {
        self.methods.insert(method.into());
        self
    }

    pub fn with_base(&mut self, method: impl Into<MethodId>, base: BaseEvidence) -> &mut Self {
        self.base.insert(method.into(), base);
        self
    }

    pub fn with_governance(
        &mut self,
        method: impl Into<MethodId>,
        governance: GovernanceEvidence,
    ) -> &mut Self {
        self.governance.insert(method.into(), governance);
        self
    }

    /// Declares a compatibility table for `axis`, replacing any previous one.
    pub fn with_table(
        &mut self,
        method: impl Into<MethodId>,
        axis: ContextAxis,
        entries: impl IntoIterator<Item = (String, ContextBand)>,
    ) -> &mut Self {
        let tables = self.compatibility.entry(method.into()).or_default();
        *tables.axis_mut(axis) = Some(entries.into_iter().collect());
        self
    }

    pub fn with_interplay(
        &mut self,
        method: impl Into<MethodId>,
        profile: InterplayProfile,
    ) -> &mut Self {
        self.interplay.insert(method.into(), profile);
        self
    }

    fn guard(cancel: &CancellationToken) -> Result<(), EvidenceError> {
        if cancel.is_cancelled() {
            return Err(EvidenceError::Cancelled);
        }
        Ok(())
    }
}

fn missing(method: &MethodId, kind: EvidenceKind) -> EvidenceError {
    EvidenceError::Missing {
        method: method.clone(),
        kind,
    }
}

impl EvidenceProvider for InMemoryEvidence {
    fn is_registered(&self, method: &MethodId) -> bool {
        self.methods.contains(method)
            || self.base.contains_key(method)
            || self.governance.contains_key(method)
            || self.compatibility.contains_key(method)
            || self.interplay.contains_key(method)
    }

    fn base_scores(
        &self,
        method: &MethodId,
        cancel: &CancellationToken,
    ) -> Result<BaseEvidence, EvidenceError> {
        Self::guard(cancel)?;
        self.base
            .get(method)
            .copied()
            .ok_or_else(|| missing(method, EvidenceKind::Base))
    }

    fn governance(
        &self,
        method: &MethodId,
        cancel: &CancellationToken,
    ) -> Result<GovernanceEvidence, EvidenceError> {
        Self::guard(cancel)?;
        self.governance
            .get(method)
            .cloned()
            .ok_or_else(|| missing(method, EvidenceKind::Governance))
    }

    fn compatibility(
        &self,
        method: &MethodId,
        axis: ContextAxis,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ContextBand>, EvidenceError> {
        Self::guard(cancel)?;
        let table = self
            .compatibility
            .get(method)
            .and_then(|tables| tables.axis(axis))
            .ok_or_else(|| missing(method, EvidenceKind::Compatibility(axis)))?;
        Ok(table.get(key).copied())
    }

    fn interplay_profile(
        &self,
        method: &MethodId,
        cancel: &CancellationToken,
    ) -> Result<InterplayProfile, EvidenceError> {
        Self::guard(cancel)?;
        self.interplay
            .get(method)
            .cloned()
            .ok_or_else(|| missing(method, EvidenceKind::Interplay))
    }
}
