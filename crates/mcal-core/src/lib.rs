//! Data model for the method calibration engine.
//!
//! Leaf crate shared by configuration and engine: identifiers, the eight
//! calibration layers and their score domains, method roles, the execution
//! context tuple, the computation graph `Γ` and interplay subgraphs `G`.

pub mod context;
pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod interplay;
pub mod layer;
pub mod node;
pub mod role;

// Re-export commonly used types
pub use context::ContextTuple;
pub use edge::DataEdge;
pub use error::CoreError;
pub use graph::{ComputationGraph, EdgeSpec, GraphSpec};
pub use id::{MethodId, NodeId};
pub use interplay::{FusionRule, InterplaySubgraph};
pub use layer::{ChainBand, ContextBand, LayerDomain, LayerId, LayerScore, LayerSet, LayerValue};
pub use node::{MethodNode, NodeSignature};
pub use role::Role;
