//! Scenario files for the `calibrate` subcommand.
//!
//! A scenario bundles a computation graph, its named interplay subgraphs,
//! the evidence to calibrate against and the subjects to calibrate:
//!
//! ```json
//! {
//!   "graph": { "nodes": [...], "edges": [{"from": 0, "to": 1, "artifact": "doc"}] },
//!   "interplay": {
//!     "fusion": {"members": [1, 2], "target_output": "score", "fusion_rule": "max"}
//!   },
//!   "evidence": { "base": {...}, "governance": {...} },
//!   "subjects": [
//!     {"method_id": "loader", "node": 0, "role": "INGEST",
//!      "context": {"dimension": "D1", "policy_area": "P1", "unit_quality": 0.9}}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use mcal_core::{ComputationGraph, ContextTuple, InterplaySubgraph, MethodId, NodeId, Role};
use mcal_engine::{CalibrationRequest, CalibrationSubject, InMemoryEvidence};

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed scenario '{path}': {source}", path = path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("subject '{method}' refers to unknown interplay group '{group}'")]
    UnknownInterplay { method: MethodId, group: String },
}

/// One method instance to calibrate.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectSpec {
    pub method_id: MethodId,
    pub node: NodeId,
    pub role: Role,
    pub context: ContextTuple,
    /// Name of the interplay group the node belongs to, if any.
    #[serde(default)]
    pub interplay: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub graph: ComputationGraph,
    #[serde(default)]
    pub interplay: BTreeMap<String, InterplaySubgraph>,
    #[serde(default)]
    pub evidence: InMemoryEvidence,
    pub subjects: Vec<SubjectSpec>,
}

impl Scenario {
    pub fn from_json(path: &Path, json: &str) -> Result<Self, ScenarioError> {
        serde_json::from_str(json).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Scenario::from_json(path, &json)
    }

    /// Builds one request per subject, borrowing the scenario's graph.
    pub fn requests(&self) -> Result<Vec<CalibrationRequest<'_>>, ScenarioError> {
        self.subjects
            .iter()
            .map(|spec| {
                let mut subject = CalibrationSubject::new(
                    spec.method_id.clone(),
                    spec.node,
                    &self.graph,
                    spec.context.clone(),
                );
                if let Some(group) = &spec.interplay {
                    let interplay = self.interplay.get(group).ok_or_else(|| {
                        ScenarioError::UnknownInterplay {
                            method: spec.method_id.clone(),
                            group: group.clone(),
                        }
                    })?;
                    subject = subject.with_interplay(interplay);
                }
                Ok(CalibrationRequest {
                    subject,
                    role: spec.role,
                })
            })
            .collect()
    }
}
