//! Element catalogue, details and editor navigation RPCs.

use std::sync::Arc;

use serde_json::{json, Value};
use tracegraph_core::{element_catalogue, EditorActions, ModelSource, NodeId, NodeKind};

use super::{parse_params, to_data, RpcHandler};
use crate::error::HandlerError;
use crate::schema::graph::{
    ElementDetails, ElementDetailsParams, ElementReference, LocateParams, LocateResult,
};

/// `getAllElements`: every page and microflow, sorted by id.
pub struct GetAllElements {
    source: Arc<dyn ModelSource>,
}

impl GetAllElements {
    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        Self { source }
    }
}

impl RpcHandler for GetAllElements {
    fn command_type(&self) -> &'static str {
        "getAllElements"
    }

    fn execute(&self, _params: Value) -> Result<Value, HandlerError> {
        to_data(&element_catalogue(self.source.as_ref())?)
    }
}

/// `getElementDetails`: one page or microflow with its references and the
/// module roles allowed on it. Unknown elements (or a type mismatch) yield `{}`.
pub struct GetElementDetails {
    source: Arc<dyn ModelSource>,
}

impl GetElementDetails {
    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        Self { source }
    }
}

impl RpcHandler for GetElementDetails {
    fn command_type(&self) -> &'static str {
        "getElementDetails"
    }

    fn execute(&self, params: Value) -> Result<Value, HandlerError> {
        let params: ElementDetailsParams = parse_params(self.command_type(), params)?;
        let records = match params.element_type {
            NodeKind::Page => self.source.list_pages()?,
            NodeKind::Microflow => self.source.list_microflows()?,
            _ => Vec::new(),
        };
        let id = NodeId::from(params.element_id.as_str());
        let Some(record) = records.into_iter().find(|r| r.id == id) else {
            tracing::debug!(element = %id, "no details for element");
            return Ok(json!({}));
        };

        let references = self
            .source
            .outgoing_references(&id)?
            .into_iter()
            .filter_map(|r| {
                r.resolved_target().map(|target| ElementReference {
                    target: target.clone(),
                    kind: r.kind,
                })
            })
            .collect();
        let allowed_roles = self.source.allowed_roles(&id)?;

        to_data(&ElementDetails {
            qualified_name: record.id,
            name: record.name,
            kind: params.element_type,
            module: record.module,
            references,
            allowed_roles,
        })
    }
}

/// `locateElement`: focuses a page or microflow in the host editor.
pub struct LocateElement {
    editor: Arc<dyn EditorActions>,
}

impl LocateElement {
    pub fn new(editor: Arc<dyn EditorActions>) -> Self {
        Self { editor }
    }
}

impl RpcHandler for LocateElement {
    fn command_type(&self) -> &'static str {
        "locateElement"
    }

    fn execute(&self, params: Value) -> Result<Value, HandlerError> {
        let params: LocateParams = parse_params(self.command_type(), params)?;
        let success = self
            .editor
            .locate(&params.qualified_name, params.element_type)?;
        if !success {
            tracing::debug!(element = %params.qualified_name, "element not found in editor");
        }
        to_data(&LocateResult { success })
    }
}
