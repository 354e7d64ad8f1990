//! The host-model contract consumed by the graph builder.
//!
//! [`ModelSource`] is the only point of contact with the IDE's reflection
//! API: listing documents and navigation entry points, and resolving the
//! outgoing references of a single element. [`EditorActions`] is the reverse
//! channel used to focus an element in the host editor. Any host can be
//! adapted behind these two traits; [`InMemoryModel`](crate::memory::InMemoryModel)
//! is the first-class backend for tests and offline snapshots.

use serde::{Deserialize, Serialize};

use crate::edge::EdgeKind;
use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::{Node, NodeKind};

/// A page or microflow document as listed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Qualified name, `Module.Name`.
    pub id: NodeId,
    pub name: String,
    pub module: String,
}

impl ElementRecord {
    /// Creates a record whose name and module are derived from the id.
    pub fn new(id: impl Into<NodeId>) -> Self {
        let id = id.into();
        ElementRecord {
            name: id.short_name().to_string(),
            module: id.module().to_string(),
            id,
        }
    }
}

/// A navigation profile and its configured home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    pub profile_name: String,
    /// `None` when the profile has no home page configured.
    #[serde(default)]
    pub home_page_id: Option<NodeId>,
}

/// One outgoing reference of an element.
///
/// A `None` or empty target is a dangling reference in a partially defined
/// model; the builder drops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub target: Option<NodeId>,
    pub kind: EdgeKind,
}

impl Reference {
    pub fn to(target: impl Into<NodeId>, kind: EdgeKind) -> Self {
        Reference {
            target: Some(target.into()),
            kind,
        }
    }

    /// Returns the target if it names something.
    pub fn resolved_target(&self) -> Option<&NodeId> {
        self.target.as_ref().filter(|id| !id.is_empty())
    }
}

/// A project user role and the module roles it aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleRecord {
    pub name: String,
    #[serde(default)]
    pub module_roles: Vec<NodeId>,
}

/// Read access to the host project model.
///
/// Implementations must be shareable across threads: the analyzer may be
/// asked to (re)build from a job worker while RPC queries run elsewhere.
pub trait ModelSource: Send + Sync {
    /// All page documents.
    fn list_pages(&self) -> Result<Vec<ElementRecord>, CoreError>;

    /// All microflow documents.
    fn list_microflows(&self) -> Result<Vec<ElementRecord>, CoreError>;

    /// Navigation profiles, the entry points of the traversal.
    fn list_navigation_entries(&self) -> Result<Vec<NavigationEntry>, CoreError>;

    /// Outgoing references of one page or microflow.
    fn outgoing_references(&self, element_id: &NodeId) -> Result<Vec<Reference>, CoreError>;

    /// Project user roles. Hosts without a security model return nothing.
    fn list_user_roles(&self) -> Result<Vec<UserRoleRecord>, CoreError> {
        Ok(Vec::new())
    }

    /// Module roles allowed to open a page or execute a microflow.
    fn allowed_roles(&self, _element_id: &NodeId) -> Result<Vec<NodeId>, CoreError> {
        Ok(Vec::new())
    }
}

/// Editor-side actions the host offers.
pub trait EditorActions: Send + Sync {
    /// Opens the editor for the element. Returns `false` if it cannot be found.
    fn locate(&self, qualified_name: &str, kind: NodeKind) -> Result<bool, CoreError>;
}

/// Lists every page and microflow as a node, sorted by id.
pub fn element_catalogue(source: &dyn ModelSource) -> Result<Vec<Node>, CoreError> {
    let pages = source.list_pages()?;
    let microflows = source.list_microflows()?;

    let mut nodes: Vec<Node> = pages
        .into_iter()
        .map(|r| record_node(r, NodeKind::Page))
        .chain(
            microflows
                .into_iter()
                .map(|r| record_node(r, NodeKind::Microflow)),
        )
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(nodes)
}

pub(crate) fn record_node(record: ElementRecord, kind: NodeKind) -> Node {
    Node {
        id: record.id,
        kind,
        name: record.name,
        module: record.module,
    }
}
