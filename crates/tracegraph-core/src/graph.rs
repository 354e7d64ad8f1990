//! TraceGraph: the immutable, fully indexed traceability graph.
//!
//! [`TraceGraph`] is produced once by the [`GraphBuilder`](crate::builder::GraphBuilder)
//! and never mutated afterwards. Besides the node table and edge list it
//! keeps forward and reverse adjacency lists so that the queries in
//! [`crate::query`] can walk the graph in either direction without scanning
//! the edge list.
//!
//! # Ordering
//!
//! Nodes keep their insertion order (`IndexMap`), edges keep the order the
//! builder discovered them in, and each adjacency list follows edge order.
//! Breadth-first queries therefore visit neighbors deterministically for a
//! given build.
//!
//! # Adjacency invariant
//!
//! Every node id is a key of both adjacency maps, with an empty list when the
//! node has no edges in that direction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::id::NodeId;
use crate::node::Node;

/// Plain `{nodes, edges}` view of a graph, the shape handed to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphView {
    /// Returns `true` if the view has neither nodes nor edges.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// The cached traceability graph.
#[derive(Debug, Clone, Default)]
pub struct TraceGraph {
    nodes: IndexMap<NodeId, Node>,
    edges: Vec<Edge>,
    forward: IndexMap<NodeId, Vec<NodeId>>,
    reverse: IndexMap<NodeId, Vec<NodeId>>,
}

impl TraceGraph {
    /// Assembles a graph from a node table and an edge list, building both
    /// adjacency maps in a single pass over the edges.
    ///
    /// Edges whose endpoints are not in the node table are dropped.
    pub fn from_parts(nodes: IndexMap<NodeId, Node>, edges: Vec<Edge>) -> Self {
        let mut forward: IndexMap<NodeId, Vec<NodeId>> =
            nodes.keys().map(|id| (id.clone(), Vec::new())).collect();
        let mut reverse = forward.clone();

        let mut kept = Vec::with_capacity(edges.len());
        for edge in edges {
            if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
                tracing::debug!(
                    source = %edge.source,
                    target = %edge.target,
                    "dropping edge with unknown endpoint"
                );
                continue;
            }
            if let Some(out) = forward.get_mut(&edge.source) {
                out.push(edge.target.clone());
            }
            if let Some(inc) = reverse.get_mut(&edge.target) {
                inc.push(edge.source.clone());
            }
            kept.push(edge);
        }

        TraceGraph {
            nodes,
            edges: kept,
            forward,
            reverse,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in discovery order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Targets of the outgoing edges of `id`, in edge order.
    pub fn successors(&self, id: &str) -> &[NodeId] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sources of the incoming edges of `id`, in edge order.
    pub fn predecessors(&self, id: &str) -> &[NodeId] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Copies the graph into its wire view.
    pub fn to_view(&self) -> GraphView {
        GraphView {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.clone(),
        }
    }
}
