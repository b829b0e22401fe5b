//! Functional roles of calibrated methods.
//!
//! A role is assigned when a method is registered and never changes. It
//! decides which layers the method must be evaluated on; the mapping itself
//! lives in the engine's requirements table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Functional category of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Executor,
    Analyzer,
    Aggregate,
    Ingest,
    Structure,
    Extract,
    Report,
    Transform,
    MetaTool,
}

impl Role {
    pub const ALL: [Role; 9] = [
        Role::Executor,
        Role::Analyzer,
        Role::Aggregate,
        Role::Ingest,
        Role::Structure,
        Role::Extract,
        Role::Report,
        Role::Transform,
        Role::MetaTool,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Executor => "EXECUTOR",
            Role::Analyzer => "ANALYZER",
            Role::Aggregate => "AGGREGATE",
            Role::Ingest => "INGEST",
            Role::Structure => "STRUCTURE",
            Role::Extract => "EXTRACT",
            Role::Report => "REPORT",
            Role::Transform => "TRANSFORM",
            Role::MetaTool => "META_TOOL",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownRole {
                raw: raw.to_string(),
            })
    }
}
