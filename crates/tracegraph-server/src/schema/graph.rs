//! Parameter and result types for the graph commands.
//!
//! Field names follow the UI's camelCase convention. Node ids are accepted as
//! plain strings; ids that don't exist in the graph are ignored by the
//! queries rather than rejected.

use serde::{Deserialize, Serialize};
use tracegraph_core::{Direction, EdgeKind, GraphView, NodeId, NodeKind};

/// Params of `findPaths`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindPathsParams {
    pub start_node_id: String,
    pub end_node_id: String,
}

/// Params of the set-based commands: `findCommonUpstream`,
/// `findCommonDownstream`, `getSubgraph` and the `graph:impact` job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIdsParams {
    pub node_ids: Vec<String>,
}

/// Params of `getReachable`. Direction defaults to forward.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachableParams {
    pub node_ids: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
}

/// Params of `locateElement`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateParams {
    pub qualified_name: String,
    pub element_type: NodeKind,
}

/// Params of `getElementDetails`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDetailsParams {
    pub element_id: String,
    pub element_type: NodeKind,
}

/// Result of `getElementDetails` for a known element.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDetails {
    pub qualified_name: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub module: String,
    /// Resolved outgoing references, in host order.
    pub references: Vec<ElementReference>,
    pub allowed_roles: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElementReference {
    pub target: NodeId,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocateResult {
    pub success: bool,
}

/// Result of the `graph:rebuild` job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub nodes: usize,
    pub edges: usize,
    pub elapsed_ms: u64,
}

/// Downstream impact of one node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeImpact {
    pub node_id: String,
    /// Everything reachable from the node, excluding itself, sorted.
    pub affected: Vec<NodeId>,
}

/// Result of the `graph:impact` job.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub impacts: Vec<NodeImpact>,
    /// Nodes reachable from every requested node.
    pub common: GraphView,
}
