//! GraphBuilder: breadth-first construction of the traceability graph.
//!
//! Construction starts from the navigation entry points. Each profile with a
//! home page yields a synthetic `Navigation.<profile>` node and a `SHOWS` edge
//! into the page. From there a FIFO queue expands pages and microflows by
//! asking the [`ModelSource`] for their outgoing references. A processed set
//! guarantees each element is expanded once, which also terminates cycles:
//! edges into an already processed node are still recorded.
//!
//! When security is enabled, user roles, module roles and their
//! `CONTAINS` / `CAN_OPEN` / `CAN_EXECUTE` edges are added for every reached
//! document. Role nodes are never expanded.
//!
//! Dangling references (no target, or a target the host cannot name) are
//! dropped without error. A failure to resolve the references of a single
//! element is logged and treated as "no references"; only listing failures
//! abort the build.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};

use crate::edge::{Edge, EdgeKind};
use crate::error::CoreError;
use crate::graph::TraceGraph;
use crate::id::NodeId;
use crate::node::{Node, NodeKind};
use crate::source::{record_node, ElementRecord, ModelSource};

/// Knobs for a graph build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Add user role / module role nodes and their edges.
    pub include_security: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            include_security: true,
        }
    }
}

/// Builds a [`TraceGraph`] from a [`ModelSource`].
pub struct GraphBuilder<'a> {
    source: &'a dyn ModelSource,
    options: BuildOptions,
    pages: HashMap<NodeId, ElementRecord>,
    microflows: HashMap<NodeId, ElementRecord>,
    nodes: IndexMap<NodeId, Node>,
    edges: IndexSet<Edge>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(source: &'a dyn ModelSource, options: BuildOptions) -> Self {
        GraphBuilder {
            source,
            options,
            pages: HashMap::new(),
            microflows: HashMap::new(),
            nodes: IndexMap::new(),
            edges: IndexSet::new(),
        }
    }

    /// Runs the traversal and returns the indexed graph.
    pub fn build(mut self) -> Result<TraceGraph, CoreError> {
        self.pages = index_records(self.source.list_pages()?);
        self.microflows = index_records(self.source.list_microflows()?);

        if self.options.include_security {
            self.add_user_roles()?;
        }

        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut processed: HashSet<NodeId> = HashSet::new();

        for entry in self.source.list_navigation_entries()? {
            let Some(home) = entry.home_page_id.filter(|id| !id.is_empty()) else {
                continue;
            };
            let nav_id = NodeId(format!("Navigation.{}", entry.profile_name));
            self.insert_node(Node::named(
                nav_id.clone(),
                NodeKind::NavigationItem,
                format!("Home Page ({})", entry.profile_name),
            ));
            self.ensure_node(&home);
            self.edges.insert(Edge::new(nav_id, home.clone(), EdgeKind::Shows));
            if processed.insert(home.clone()) {
                queue.push_back(home);
            }
        }

        while let Some(current) = queue.pop_front() {
            let Some(kind) = self.document_kind(&current) else {
                continue;
            };

            let references = match self.source.outgoing_references(&current) {
                Ok(refs) => refs,
                Err(err) => {
                    tracing::warn!(element = %current, error = %err, "skipping references");
                    Vec::new()
                }
            };

            for reference in references {
                let Some(target) = reference.resolved_target() else {
                    continue;
                };
                self.ensure_node(target);
                self.edges
                    .insert(Edge::new(current.clone(), target.clone(), reference.kind));
                if processed.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
            }

            if self.options.include_security {
                self.add_allowed_roles(&current, kind);
            }
        }

        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "traceability graph built"
        );

        Ok(TraceGraph::from_parts(
            self.nodes,
            self.edges.into_iter().collect(),
        ))
    }

    // -----------------------------------------------------------------------
    // Security layer
    // -----------------------------------------------------------------------

    fn add_user_roles(&mut self) -> Result<(), CoreError> {
        for role in self.source.list_user_roles()? {
            let user_id = NodeId(role.name.clone());
            self.insert_node(Node::named(user_id.clone(), NodeKind::UserRole, role.name));
            for module_role in role.module_roles {
                self.insert_node(Node::from_id(module_role.clone(), NodeKind::ModuleRole));
                self.edges
                    .insert(Edge::new(user_id.clone(), module_role, EdgeKind::Contains));
            }
        }
        Ok(())
    }

    fn add_allowed_roles(&mut self, element: &NodeId, kind: NodeKind) {
        let edge_kind = match kind {
            NodeKind::Page => EdgeKind::CanOpen,
            _ => EdgeKind::CanExecute,
        };
        let roles = match self.source.allowed_roles(element) {
            Ok(roles) => roles,
            Err(err) => {
                tracing::warn!(element = %element, error = %err, "skipping allowed roles");
                return;
            }
        };
        for role in roles.into_iter().filter(|r| !r.is_empty()) {
            self.insert_node(Node::from_id(role.clone(), NodeKind::ModuleRole));
            self.edges
                .insert(Edge::new(role, element.clone(), edge_kind));
        }
    }

    // -----------------------------------------------------------------------
    // Node table
    // -----------------------------------------------------------------------

    /// First write wins.
    fn insert_node(&mut self, node: Node) {
        self.nodes.entry(node.id.clone()).or_insert(node);
    }

    /// Inserts a node for a reference target, typed by the document tables.
    fn ensure_node(&mut self, id: &NodeId) {
        if self.nodes.contains_key(id) {
            return;
        }
        let node = if let Some(page) = self.pages.get(id) {
            record_node(page.clone(), NodeKind::Page)
        } else if let Some(mf) = self.microflows.get(id) {
            record_node(mf.clone(), NodeKind::Microflow)
        } else {
            Node::from_id(id.clone(), NodeKind::Unknown)
        };
        self.nodes.insert(id.clone(), node);
    }

    fn document_kind(&self, id: &NodeId) -> Option<NodeKind> {
        if self.pages.contains_key(id) {
            Some(NodeKind::Page)
        } else if self.microflows.contains_key(id) {
            Some(NodeKind::Microflow)
        } else {
            None
        }
    }
}

fn index_records(records: Vec<ElementRecord>) -> HashMap<NodeId, ElementRecord> {
    records.into_iter().map(|r| (r.id.clone(), r)).collect()
}

/// Convenience wrapper: builds a graph in one call.
pub fn build_graph(source: &dyn ModelSource, options: BuildOptions) -> Result<TraceGraph, CoreError> {
    GraphBuilder::new(source, options).build()
}
