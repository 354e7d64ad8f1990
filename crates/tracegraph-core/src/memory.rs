//! In-memory implementation of [`ModelSource`] and [`EditorActions`].
//!
//! [`InMemoryModel`] is a first-class backend for tests, offline analysis of
//! exported model snapshots, and anywhere a live host isn't available. It
//! stores plain records and answers every query from them with the same
//! semantics a host adapter must provide.
//!
//! Snapshots are JSON documents:
//!
//! ```json
//! {
//!   "pages": [{"id": "Main.Home", "name": "Home", "module": "Main"}],
//!   "microflows": [],
//!   "navigation": [{"profileName": "Responsive", "homePageId": "Main.Home"}],
//!   "references": {"Main.Home": [{"target": "Main.ACT_Load", "kind": "CALLS"}]},
//!   "userRoles": [{"name": "User", "moduleRoles": ["Main.User"]}],
//!   "allowedRoles": {"Main.Home": ["Main.User"]}
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::edge::EdgeKind;
use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::NodeKind;
use crate::source::{
    EditorActions, ElementRecord, ModelSource, NavigationEntry, Reference, UserRoleRecord,
};

/// A project model held entirely in memory.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InMemoryModel {
    #[serde(default)]
    pages: Vec<ElementRecord>,
    #[serde(default)]
    microflows: Vec<ElementRecord>,
    #[serde(default)]
    navigation: Vec<NavigationEntry>,
    #[serde(default)]
    references: HashMap<NodeId, Vec<Reference>>,
    #[serde(default)]
    user_roles: Vec<UserRoleRecord>,
    #[serde(default)]
    allowed_roles: HashMap<NodeId, Vec<NodeId>>,
    /// Elements focused through [`EditorActions::locate`], in call order.
    #[serde(skip)]
    located: Mutex<Vec<NodeId>>,
}

impl InMemoryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON snapshot file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    // -----------------------------------------------------------------------
    // Builder-style population
    // -----------------------------------------------------------------------

    pub fn with_page(mut self, id: &str) -> Self {
        self.pages.push(ElementRecord::new(id));
        self
    }

    pub fn with_microflow(mut self, id: &str) -> Self {
        self.microflows.push(ElementRecord::new(id));
        self
    }

    /// Adds a navigation profile whose home page is `home_page`.
    pub fn with_navigation(mut self, profile: &str, home_page: &str) -> Self {
        self.navigation.push(NavigationEntry {
            profile_name: profile.to_string(),
            home_page_id: Some(NodeId::from(home_page)),
        });
        self
    }

    /// Adds an outgoing reference `from -> to`.
    pub fn with_reference(mut self, from: &str, to: &str, kind: EdgeKind) -> Self {
        self.references
            .entry(NodeId::from(from))
            .or_default()
            .push(Reference::to(to, kind));
        self
    }

    /// Adds a reference whose target could not be resolved by the host.
    pub fn with_dangling_reference(mut self, from: &str, kind: EdgeKind) -> Self {
        self.references
            .entry(NodeId::from(from))
            .or_default()
            .push(Reference { target: None, kind });
        self
    }

    pub fn with_user_role(mut self, name: &str, module_roles: &[&str]) -> Self {
        self.user_roles.push(UserRoleRecord {
            name: name.to_string(),
            module_roles: module_roles.iter().map(|r| NodeId::from(*r)).collect(),
        });
        self
    }

    /// Allows `module_role` to open or execute `element`.
    pub fn with_allowed_role(mut self, element: &str, module_role: &str) -> Self {
        self.allowed_roles
            .entry(NodeId::from(element))
            .or_default()
            .push(NodeId::from(module_role));
        self
    }

    /// Elements focused so far, in call order.
    pub fn located(&self) -> Vec<NodeId> {
        self.located
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }

    fn kind_of(&self, id: &str) -> Option<NodeKind> {
        if self.pages.iter().any(|p| p.id.as_str() == id) {
            Some(NodeKind::Page)
        } else if self.microflows.iter().any(|m| m.id.as_str() == id) {
            Some(NodeKind::Microflow)
        } else {
            None
        }
    }
}

impl ModelSource for InMemoryModel {
    fn list_pages(&self) -> Result<Vec<ElementRecord>, CoreError> {
        Ok(self.pages.clone())
    }

    fn list_microflows(&self) -> Result<Vec<ElementRecord>, CoreError> {
        Ok(self.microflows.clone())
    }

    fn list_navigation_entries(&self) -> Result<Vec<NavigationEntry>, CoreError> {
        Ok(self.navigation.clone())
    }

    fn outgoing_references(&self, element_id: &NodeId) -> Result<Vec<Reference>, CoreError> {
        Ok(self.references.get(element_id).cloned().unwrap_or_default())
    }

    fn list_user_roles(&self) -> Result<Vec<UserRoleRecord>, CoreError> {
        Ok(self.user_roles.clone())
    }

    fn allowed_roles(&self, element_id: &NodeId) -> Result<Vec<NodeId>, CoreError> {
        Ok(self.allowed_roles.get(element_id).cloned().unwrap_or_default())
    }
}

impl EditorActions for InMemoryModel {
    fn locate(&self, qualified_name: &str, kind: NodeKind) -> Result<bool, CoreError> {
        if self.kind_of(qualified_name) != Some(kind) {
            return Ok(false);
        }
        if let Ok(mut located) = self.located.lock() {
            located.push(NodeId::from(qualified_name));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot() {
        let model = InMemoryModel::from_json(
            r#"{
                "pages": [{"id": "Main.Home", "name": "Home", "module": "Main"}],
                "microflows": [{"id": "Main.ACT_Load", "name": "ACT_Load", "module": "Main"}],
                "navigation": [{"profileName": "Responsive", "homePageId": "Main.Home"}],
                "references": {"Main.Home": [{"target": "Main.ACT_Load", "kind": "CALLS"}]},
                "userRoles": [{"name": "User", "moduleRoles": ["Main.User"]}],
                "allowedRoles": {"Main.Home": ["Main.User"]}
            }"#,
        )
        .unwrap();

        assert_eq!(model.list_pages().unwrap().len(), 1);
        assert_eq!(model.list_microflows().unwrap().len(), 1);
        let refs = model.outgoing_references(&NodeId::from("Main.Home")).unwrap();
        assert_eq!(refs, vec![Reference::to("Main.ACT_Load", EdgeKind::Calls)]);
        assert_eq!(
            model.allowed_roles(&NodeId::from("Main.Home")).unwrap(),
            vec![NodeId::from("Main.User")]
        );
        assert_eq!(model.list_user_roles().unwrap()[0].name, "User");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let model = InMemoryModel::from_json("{}").unwrap();
        assert!(model.list_pages().unwrap().is_empty());
        assert!(model.list_navigation_entries().unwrap().is_empty());
        assert!(model
            .outgoing_references(&NodeId::from("X.Y"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let err = InMemoryModel::from_json("{\"pages\": 3}").unwrap_err();
        assert!(matches!(err, CoreError::Snapshot(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = InMemoryModel::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn locate_checks_kind_and_records() {
        let model = InMemoryModel::new()
            .with_page("Main.Home")
            .with_microflow("Main.ACT_Load");

        assert!(model.locate("Main.Home", NodeKind::Page).unwrap());
        assert!(!model.locate("Main.Home", NodeKind::Microflow).unwrap());
        assert!(!model.locate("Main.Missing", NodeKind::Page).unwrap());
        assert_eq!(model.located(), vec![NodeId::from("Main.Home")]);
    }
}
