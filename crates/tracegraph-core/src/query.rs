//! Read-only queries over a built [`TraceGraph`].
//!
//! All traversals are breadth-first and visit neighbors in adjacency order,
//! so results are deterministic for a given build:
//!
//! - [`TraceGraph::find_paths`]: one shortest path by edge count.
//! - [`TraceGraph::reachable_set`]: union of everything reachable from a set
//!   of seeds, forward (descendants) or backward (ancestors).
//! - [`TraceGraph::common_upstream`] / [`TraceGraph::common_downstream`]:
//!   intersection of ancestor / descendant sets, minus the seeds themselves.
//! - [`TraceGraph::subgraph`]: the node-induced subgraph.
//! - [`TraceGraph::cycles`]: strongly connected components that form cycles.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::graph::{GraphView, TraceGraph};
use crate::id::NodeId;
use crate::node::Node;

/// Traversal direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges source to target (descendants, impact).
    #[default]
    Forward,
    /// Follow edges target to source (ancestors, dependencies).
    Backward,
}

impl TraceGraph {
    fn neighbors(&self, id: &str, direction: Direction) -> &[NodeId] {
        match direction {
            Direction::Forward => self.successors(id),
            Direction::Backward => self.predecessors(id),
        }
    }

    /// Returns a single shortest path from `start` to `end`, as resolved
    /// nodes from start to end inclusive.
    ///
    /// The result holds at most one path: the first one breadth-first search
    /// reaches, which is the one whose edges were inserted earliest when
    /// several paths tie on length. It is empty when either endpoint is not
    /// in the graph or `end` is unreachable.
    pub fn find_paths(&self, start: &str, end: &str) -> Vec<Vec<Node>> {
        if !self.contains(start) || !self.contains(end) {
            return Vec::new();
        }

        let start_id = NodeId::from(start);
        let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
        let mut visited: HashSet<NodeId> = HashSet::from([start_id.clone()]);
        let mut queue = VecDeque::from([start_id.clone()]);

        while let Some(current) = queue.pop_front() {
            if current.as_str() == end {
                let mut path = vec![current.clone()];
                let mut cursor = &current;
                while let Some(prev) = parent.get(cursor) {
                    path.push(prev.clone());
                    cursor = prev;
                }
                path.reverse();
                let nodes = path
                    .iter()
                    .filter_map(|id| self.node(id.as_str()).cloned())
                    .collect();
                return vec![nodes];
            }

            for neighbor in self.successors(current.as_str()) {
                if visited.insert(neighbor.clone()) {
                    parent.insert(neighbor.clone(), current.clone());
                    queue.push_back(neighbor.clone());
                }
            }
        }

        Vec::new()
    }

    /// Everything reachable from any of `starts`, seeds included, in
    /// breadth-first discovery order. Seeds absent from the graph are ignored.
    pub fn reachable_set<S: AsRef<str>>(&self, starts: &[S], direction: Direction) -> IndexSet<NodeId> {
        let mut visited: IndexSet<NodeId> = IndexSet::new();
        let mut queue = VecDeque::new();

        for start in starts {
            let start = start.as_ref();
            if self.contains(start) && visited.insert(NodeId::from(start)) {
                queue.push_back(NodeId::from(start));
            }
        }

        while let Some(current) = queue.pop_front() {
            for neighbor in self.neighbors(current.as_str(), direction) {
                if visited.insert(neighbor.clone()) {
                    queue.push_back(neighbor.clone());
                }
            }
        }

        visited
    }

    /// Nodes that are ancestors of every id in `ids`, as an induced subgraph.
    ///
    /// The ids themselves are never part of the result, even when a cycle
    /// makes a node its own ancestor.
    pub fn common_upstream<S: AsRef<str>>(&self, ids: &[S]) -> GraphView {
        self.common_related(ids, Direction::Backward)
    }

    /// Nodes that are descendants of every id in `ids`, as an induced
    /// subgraph. The ids themselves are excluded.
    pub fn common_downstream<S: AsRef<str>>(&self, ids: &[S]) -> GraphView {
        self.common_related(ids, Direction::Forward)
    }

    fn common_related<S: AsRef<str>>(&self, ids: &[S], direction: Direction) -> GraphView {
        let Some((first, rest)) = ids.split_first() else {
            return GraphView::default();
        };

        let mut common: HashSet<NodeId> = self
            .reachable_set(std::slice::from_ref(first), direction)
            .into_iter()
            .collect();
        for id in rest {
            if common.is_empty() {
                break;
            }
            let related = self.reachable_set(std::slice::from_ref(id), direction);
            common.retain(|n| related.contains(n));
        }
        for id in ids {
            common.remove(id.as_ref());
        }

        self.subgraph_of(|id| common.contains(id.as_str()))
    }

    /// The node-induced subgraph over `ids`: those nodes, plus every edge
    /// whose endpoints are both in the set. Ordering follows the full graph.
    pub fn subgraph<S: AsRef<str>>(&self, ids: &[S]) -> GraphView {
        let keep: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();
        self.subgraph_of(|id| keep.contains(id.as_str()))
    }

    fn subgraph_of(&self, keep: impl Fn(&NodeId) -> bool) -> GraphView {
        GraphView {
            nodes: self.nodes().filter(|n| keep(&n.id)).cloned().collect(),
            edges: self
                .edges()
                .iter()
                .filter(|e| e.is_within(&keep))
                .cloned()
                .collect(),
        }
    }

    /// Groups of nodes that form cycles: strongly connected components with
    /// more than one member, or a single node with a self-loop. Members are
    /// sorted by id and groups by their first member.
    pub fn cycles(&self) -> Vec<Vec<NodeId>> {
        let mut graph: DiGraph<&NodeId, ()> = DiGraph::with_capacity(self.node_count(), self.edge_count());
        let index: HashMap<&NodeId, NodeIndex> = self
            .nodes()
            .map(|n| (&n.id, graph.add_node(&n.id)))
            .collect();
        for edge in self.edges() {
            if let (Some(&s), Some(&t)) = (index.get(&edge.source), index.get(&edge.target)) {
                graph.update_edge(s, t, ());
            }
        }

        let mut groups: Vec<Vec<NodeId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut ids: Vec<NodeId> = component.iter().map(|&ix| graph[ix].clone()).collect();
                ids.sort();
                ids
            })
            .collect();
        groups.sort();
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Edge, EdgeKind};
    use crate::node::NodeKind;
    use indexmap::IndexMap;

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> TraceGraph {
        let nodes: IndexMap<NodeId, Node> = ids
            .iter()
            .map(|id| (NodeId::from(*id), Node::from_id(NodeId::from(*id), NodeKind::Page)))
            .collect();
        let edges = edges
            .iter()
            .map(|(s, t)| Edge::new(*s, *t, EdgeKind::Calls))
            .collect();
        TraceGraph::from_parts(nodes, edges)
    }

    fn path_ids(paths: &[Vec<Node>]) -> Vec<Vec<&str>> {
        paths
            .iter()
            .map(|p| p.iter().map(|n| n.id.as_str()).collect())
            .collect()
    }

    fn view_ids(view: &GraphView) -> Vec<&str> {
        view.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn shortest_path_tie_breaks_on_insertion_order() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")],
        );
        assert_eq!(path_ids(&g.find_paths("A", "D")), vec![vec!["A", "B", "D"]]);

        let g = graph(
            &["A", "B", "C", "D"],
            &[("A", "C"), ("A", "B"), ("B", "D"), ("C", "D")],
        );
        assert_eq!(path_ids(&g.find_paths("A", "D")), vec![vec!["A", "C", "D"]]);
    }

    #[test]
    fn shortest_path_prefers_fewer_edges() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("B", "C"), ("C", "D"), ("A", "D")],
        );
        assert_eq!(path_ids(&g.find_paths("A", "D")), vec![vec!["A", "D"]]);
    }

    #[test]
    fn path_to_self_is_the_single_node() {
        let g = graph(&["A"], &[]);
        assert_eq!(path_ids(&g.find_paths("A", "A")), vec![vec!["A"]]);
    }

    #[test]
    fn no_path_cases() {
        let g = graph(&["A", "B", "C"], &[("A", "B")]);
        assert!(g.find_paths("A", "C").is_empty());
        assert!(g.find_paths("B", "A").is_empty());
        assert!(g.find_paths("A", "Z").is_empty());
        assert!(g.find_paths("Z", "A").is_empty());
    }

    #[test]
    fn reachable_includes_seeds_and_unions() {
        let g = graph(
            &["A", "B", "C", "D", "E"],
            &[("A", "B"), ("B", "C"), ("D", "E")],
        );
        let fwd = g.reachable_set(&["A", "D"], Direction::Forward);
        let mut ids: Vec<&str> = fwd.iter().map(NodeId::as_str).collect();
        ids.sort();
        assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);

        let back = g.reachable_set(&["C"], Direction::Backward);
        let ids: Vec<&str> = back.iter().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);

        assert!(g.reachable_set(&["Z"], Direction::Forward).is_empty());
    }

    #[test]
    fn common_upstream_excludes_seeds_even_in_cycles() {
        let g = graph(
            &["R", "X", "Y"],
            &[("R", "X"), ("R", "Y"), ("X", "Y"), ("Y", "X")],
        );
        let view = g.common_upstream(&["X", "Y"]);
        assert_eq!(view_ids(&view), vec!["R"]);
        assert!(view.edges.is_empty());
    }

    #[test]
    fn common_downstream_returns_induced_subgraph() {
        let g = graph(
            &["A", "B", "S", "T"],
            &[("A", "S"), ("B", "S"), ("S", "T"), ("A", "T")],
        );
        let view = g.common_downstream(&["A", "B"]);
        assert_eq!(view_ids(&view), vec!["S", "T"]);
        assert_eq!(view.edges, vec![Edge::new("S", "T", EdgeKind::Calls)]);
    }

    #[test]
    fn common_queries_on_empty_input() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let none: [&str; 0] = [];
        assert!(g.common_upstream(&none).is_empty());
        assert!(g.common_downstream(&none).is_empty());
    }

    #[test]
    fn disjoint_ancestries_have_nothing_in_common() {
        let g = graph(&["A", "B", "C", "D"], &[("A", "B"), ("C", "D")]);
        assert!(g.common_upstream(&["B", "D"]).is_empty());
    }

    #[test]
    fn subgraph_drops_edges_leaving_the_set() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let view = g.subgraph(&["A", "B", "Missing"]);
        assert_eq!(view_ids(&view), vec!["A", "B"]);
        assert_eq!(view.edges, vec![Edge::new("A", "B", EdgeKind::Calls)]);
    }

    #[test]
    fn cycles_finds_loops_and_self_calls() {
        let g = graph(
            &["A", "B", "C", "R", "S"],
            &[("A", "B"), ("B", "A"), ("B", "C"), ("R", "R"), ("C", "S")],
        );
        let cycles = g.cycles();
        assert_eq!(
            cycles,
            vec![
                vec![NodeId::from("A"), NodeId::from("B")],
                vec![NodeId::from("R")]
            ]
        );
    }

    #[test]
    fn direction_wire_names() {
        assert_eq!(serde_json::to_string(&Direction::Backward).unwrap(), "\"backward\"");
        let d: Direction = serde_json::from_str("\"forward\"").unwrap();
        assert_eq!(d, Direction::Forward);
    }
}
