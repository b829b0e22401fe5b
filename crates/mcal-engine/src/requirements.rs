//! Role ontology: which layers each role must be calibrated on.
//!
//! The table is data, not behaviour. It also names the transform the unit
//! layer applies to `U` for each role, since structure sensitivity is a
//! property of the role.

use serde::Serialize;

use mcal_core::{LayerSet, Role};
use mcal_core::LayerId::{Base, Chain, Congruence, Dimension, Meta, Policy, Unit};

/// How `@u` maps the unit quality `U` to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitTransform {
    /// Role is not structure-sensitive; `@u = 1`.
    Insensitive,
    /// `g(U) = U`.
    Identity,
    /// `g(U) = 0` below 0.3, `1.25·U − 0.25` above.
    ThresholdLinear,
    /// `g(U) = max(0, 1 − e^{−5(U−0.3)})`, scaled so `g(1) = 1`.
    SaturatingExponential,
}

const ABORT_THRESHOLD: f64 = 0.3;
const SATURATION_RATE: f64 = 5.0;

impl UnitTransform {
    pub fn apply(self, u: f64) -> f64 {
        let g = match self {
            UnitTransform::Insensitive => 1.0,
            UnitTransform::Identity => u,
            UnitTransform::ThresholdLinear => {
                if u < ABORT_THRESHOLD {
                    0.0
                } else {
                    1.25 * u - 0.25
                }
            }
            UnitTransform::SaturatingExponential => saturating(u) / saturating(1.0),
        };
        g.clamp(0.0, 1.0)
    }

    pub fn is_sensitive(self) -> bool {
        self != UnitTransform::Insensitive
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitTransform::Insensitive => "insensitive",
            UnitTransform::Identity => "identity",
            UnitTransform::ThresholdLinear => "threshold_linear",
            UnitTransform::SaturatingExponential => "saturating_exponential",
        }
    }
}

fn saturating(u: f64) -> f64 {
    (1.0 - (-SATURATION_RATE * (u - ABORT_THRESHOLD)).exp()).max(0.0)
}

/// One row of the role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleProfile {
    pub role: Role,
    pub required: LayerSet,
    pub unit_transform: UnitTransform,
    pub description: &'static str,
}

const ROLE_TABLE: [RoleProfile; 9] = [
    RoleProfile {
        role: Role::Executor,
        required: LayerSet::ALL,
        unit_transform: UnitTransform::SaturatingExponential,
        description: "answers a question end to end",
    },
    RoleProfile {
        role: Role::Analyzer,
        required: LayerSet::ALL,
        unit_transform: UnitTransform::SaturatingExponential,
        description: "performs domain analysis over extracted evidence",
    },
    RoleProfile {
        role: Role::Aggregate,
        required: LayerSet::of(&[Base, Chain, Dimension, Policy, Congruence, Meta]),
        unit_transform: UnitTransform::Insensitive,
        description: "combines results across questions or dimensions",
    },
    RoleProfile {
        role: Role::Ingest,
        required: LayerSet::of(&[Base, Chain, Unit, Meta]),
        unit_transform: UnitTransform::Identity,
        description: "loads raw documents",
    },
    RoleProfile {
        role: Role::Structure,
        required: LayerSet::of(&[Base, Chain, Unit, Meta]),
        unit_transform: UnitTransform::Identity,
        description: "builds the structural model of a document",
    },
    RoleProfile {
        role: Role::Extract,
        required: LayerSet::of(&[Base, Chain, Unit, Meta]),
        unit_transform: UnitTransform::ThresholdLinear,
        description: "extracts features from structured documents",
    },
    RoleProfile {
        role: Role::Report,
        required: LayerSet::of(&[Base, Chain, Congruence, Meta]),
        unit_transform: UnitTransform::Insensitive,
        description: "renders results for consumers",
    },
    RoleProfile {
        role: Role::Transform,
        required: LayerSet::of(&[Base, Chain, Meta]),
        unit_transform: UnitTransform::Insensitive,
        description: "reshapes data between stages",
    },
    RoleProfile {
        role: Role::MetaTool,
        required: LayerSet::of(&[Base, Chain, Meta]),
        unit_transform: UnitTransform::Insensitive,
        description: "supports the pipeline without producing analysis",
    },
];

/// The full role table in declaration order.
pub fn role_table() -> &'static [RoleProfile] {
    &ROLE_TABLE
}

pub fn role_profile(role: Role) -> &'static RoleProfile {
    // Rows are declared in `Role::ALL` order.
    &ROLE_TABLE[role as usize]
}

/// Layers a method with `role` must be evaluated on.
pub fn required_layers(role: Role) -> LayerSet {
    role_profile(role).required
}
