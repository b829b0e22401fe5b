//! Edge typing `T` of the computation graph.
//!
//! Every edge is a data dependency: the source method produces a named
//! artifact that the target method consumes. The artifact name is what the
//! chain layer matches against node signatures.

use serde::{Deserialize, Serialize};

/// A data-flow edge carrying one named artifact from source to target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataEdge {
    /// Name of the artifact flowing along the edge (e.g. `"raw_tables"`).
    pub artifact: String,
}

impl DataEdge {
    pub fn new(artifact: impl Into<String>) -> Self {
        DataEdge {
            artifact: artifact.into(),
        }
    }
}
