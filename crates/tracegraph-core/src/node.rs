//! Graph nodes: one per distinct model element.
//!
//! A [`Node`] carries just enough to render and filter a traceability view:
//! its id, its [`NodeKind`], a short display name, and the owning module.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

/// Kind of model element a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// A page (screen) document.
    Page,
    /// A microflow (server-side logic) document.
    Microflow,
    /// A navigation entry point such as a profile home page.
    NavigationItem,
    /// A module-scoped security role.
    ModuleRole,
    /// A project-level user role aggregating module roles.
    UserRole,
    /// Referenced, but not resolvable to a page or microflow.
    Unknown,
}

impl NodeKind {
    /// Returns `true` for document kinds the builder expands references of.
    pub fn is_document(&self) -> bool {
        matches!(self, NodeKind::Page | NodeKind::Microflow)
    }
}

/// A node in the traceability graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identity.
    pub id: NodeId,
    /// Element kind, serialized as `type` on the wire.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Short display name.
    pub name: String,
    /// Owning module.
    pub module: String,
}

impl Node {
    /// Creates a node whose name and module are derived from the id.
    pub fn from_id(id: NodeId, kind: NodeKind) -> Self {
        let name = id.short_name().to_string();
        let module = id.module().to_string();
        Node {
            id,
            kind,
            name,
            module,
        }
    }

    /// Creates a node with an explicit display name.
    pub fn named(id: NodeId, kind: NodeKind, name: impl Into<String>) -> Self {
        let module = id.module().to_string();
        Node {
            id,
            kind,
            name: name.into(),
            module,
        }
    }
}
