//! Stable identifier newtype for graph nodes.
//!
//! Model elements are addressed by their qualified name (`Module.Element`),
//! synthetic entries (navigation seeds, user roles) by a generated key. Both
//! live in [`NodeId`], a transparent wrapper over `String` so that a node id
//! cannot be confused with a display name or a module name.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier. Two records with the same id are the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Creates a node id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty id, which never names a real element.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First dot-separated segment. An id without a dot is its own module.
    pub fn module(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Last dot-separated segment.
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

// Lets maps keyed by NodeId be queried with a plain &str.
impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
