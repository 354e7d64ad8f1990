//! Handler traits and the registry the dispatcher routes through.
//!
//! Three capability kinds exist, each keyed by its `command_type()` string:
//!
//! - [`RpcHandler`]: request/response, executed inline by the dispatcher.
//! - [`JobHandler`]: long-running, executed on the job runner's worker pool
//!   with progress reporting and cooperative cancellation.
//! - [`SessionHandler`]: a named channel that UI panels connect to and
//!   disconnect from.
//!
//! Handlers are thin: they parse params, call into the analyzer or the model
//! source, and serialise the result. Routing, error wrapping and envelopes
//! are the dispatcher's job.

pub mod elements;
pub mod graph;
pub mod jobs;
pub mod sessions;

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HandlerError;
use crate::jobs::JobContext;

pub trait RpcHandler: Send + Sync {
    fn command_type(&self) -> &'static str;

    /// Runs the call. `params` is `Value::Null` when the request had none.
    fn execute(&self, params: Value) -> Result<Value, HandlerError>;
}

pub trait JobHandler: Send + Sync {
    fn command_type(&self) -> &'static str;

    /// Runs the job on a worker thread. Long loops should poll
    /// [`JobContext::check_cancelled`].
    fn run(&self, params: Value, ctx: &JobContext) -> Result<Value, HandlerError>;
}

pub trait SessionHandler: Send + Sync {
    fn command_type(&self) -> &'static str;

    fn on_connect(&self, session_id: &str, payload: Option<Value>);

    fn on_disconnect(&self, session_id: &str);
}

/// Deserialises handler params, treating absent params as `{}`.
pub fn parse_params<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, HandlerError> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(params)
        .map_err(|err| HandlerError::msg(format!("invalid params for '{method}': {err}")))
}

/// Serialises a handler result.
pub fn to_data<T: serde::Serialize>(value: &T) -> Result<Value, HandlerError> {
    Ok(serde_json::to_value(value)?)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Handler tables keyed by command type. Built once at startup and read-only
/// afterwards.
#[derive(Default)]
pub struct HandlerRegistry {
    rpc: HashMap<&'static str, Arc<dyn RpcHandler>>,
    jobs: HashMap<&'static str, Arc<dyn JobHandler>>,
    sessions: HashMap<&'static str, Arc<dyn SessionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rpc(mut self, handler: Arc<dyn RpcHandler>) -> Self {
        if let Some(old) = self.rpc.insert(handler.command_type(), handler) {
            tracing::warn!(method = old.command_type(), "replacing RPC handler");
        }
        self
    }

    pub fn with_job(mut self, handler: Arc<dyn JobHandler>) -> Self {
        if let Some(old) = self.jobs.insert(handler.command_type(), handler) {
            tracing::warn!(method = old.command_type(), "replacing job handler");
        }
        self
    }

    pub fn with_session(mut self, handler: Arc<dyn SessionHandler>) -> Self {
        if let Some(old) = self.sessions.insert(handler.command_type(), handler) {
            tracing::warn!(channel = old.command_type(), "replacing session handler");
        }
        self
    }

    pub fn rpc(&self, method: &str) -> Option<&Arc<dyn RpcHandler>> {
        self.rpc.get(method)
    }

    pub fn job(&self, method: &str) -> Option<&Arc<dyn JobHandler>> {
        self.jobs.get(method)
    }

    pub fn session(&self, channel: &str) -> Option<&Arc<dyn SessionHandler>> {
        self.sessions.get(channel)
    }

    /// Registered RPC method names, sorted.
    pub fn rpc_methods(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.rpc.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Registered job method names, sorted.
    pub fn job_methods(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.jobs.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Registered session channels, sorted.
    pub fn channels(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.sessions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct Named(&'static str, i64);

    impl RpcHandler for Named {
        fn command_type(&self) -> &'static str {
            self.0
        }

        fn execute(&self, _: Value) -> Result<Value, HandlerError> {
            Ok(json!(self.1))
        }
    }

    #[derive(Debug, Deserialize)]
    struct Params {
        #[serde(default)]
        limit: Option<u32>,
    }

    #[test]
    fn later_registration_wins() {
        let registry = HandlerRegistry::new()
            .with_rpc(Arc::new(Named("a", 1)))
            .with_rpc(Arc::new(Named("b", 2)))
            .with_rpc(Arc::new(Named("a", 3)));
        assert_eq!(registry.rpc_methods(), vec!["a", "b"]);
        let result = registry.rpc("a").unwrap().execute(Value::Null).unwrap();
        assert_eq!(result, json!(3));
        assert!(registry.rpc("c").is_none());
        assert!(registry.job("a").is_none());
    }

    #[test]
    fn null_params_parse_as_empty_object() {
        let params: Params = parse_params("m", Value::Null).unwrap();
        assert!(params.limit.is_none());
    }

    #[test]
    fn bad_params_name_the_method() {
        let err = parse_params::<Params>("m", json!({"limit": "lots"})).unwrap_err();
        assert!(err.message().starts_with("invalid params for 'm':"));
    }
}
