//! Traceability graph engine for low-code project models.
//!
//! Builds a directed graph of pages, microflows, navigation entries and
//! security roles from a host [`ModelSource`], caches it, and answers
//! impact-analysis queries over it: shortest path, reachability, common
//! ancestors/descendants and induced subgraphs.

pub mod analyzer;
pub mod builder;
pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod memory;
pub mod node;
pub mod query;
pub mod source;

// Re-export commonly used types
pub use analyzer::TraceabilityAnalyzer;
pub use builder::{build_graph, BuildOptions, GraphBuilder};
pub use edge::{Edge, EdgeKind};
pub use error::CoreError;
pub use graph::{GraphView, TraceGraph};
pub use id::NodeId;
pub use memory::InMemoryModel;
pub use node::{Node, NodeKind};
pub use query::Direction;
pub use source::{
    element_catalogue, EditorActions, ElementRecord, ModelSource, NavigationEntry, Reference,
    UserRoleRecord,
};
