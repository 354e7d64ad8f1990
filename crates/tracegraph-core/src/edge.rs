//! Typed directed edges between model elements.
//!
//! Several edges may connect the same pair of nodes as long as their
//! [`EdgeKind`] differs; identical `(source, target, kind)` triples are the
//! same edge and are stored once.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

/// Relationship carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Invokes a microflow (page data source/action, sub-microflow call).
    Calls,
    /// Opens a page (navigation home page, show-page action).
    Shows,
    /// A user role contains a module role.
    Contains,
    /// A module role may open a page.
    CanOpen,
    /// A module role may execute a microflow.
    CanExecute,
}

/// A directed edge in the traceability graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, kind: EdgeKind) -> Self {
        Edge {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    /// Returns `true` if both endpoints satisfy `keep`.
    pub fn is_within(&self, keep: impl Fn(&NodeId) -> bool) -> bool {
        keep(&self.source) && keep(&self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identical_triples_collapse_in_a_set() {
        let mut set = HashSet::new();
        set.insert(Edge::new("A.P", "A.MF", EdgeKind::Calls));
        set.insert(Edge::new("A.P", "A.MF", EdgeKind::Calls));
        set.insert(Edge::new("A.P", "A.MF", EdgeKind::Shows));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn wire_shape() {
        let json = serde_json::to_value(Edge::new("R.User", "A.P", EdgeKind::CanOpen)).unwrap();
        assert_eq!(json["source"], "R.User");
        assert_eq!(json["target"], "A.P");
        assert_eq!(json["type"], "CAN_OPEN");
    }
}
