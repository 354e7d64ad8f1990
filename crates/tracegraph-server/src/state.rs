//! Application state: the composition root.
//!
//! [`AppState`] wires one model backend, the analyzer over it, the handler
//! registry and the dispatcher together. The model must implement both
//! [`ModelSource`] and [`EditorActions`]; the same object answers graph
//! builds and editor navigation.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracegraph_core::{BuildOptions, EditorActions, InMemoryModel, ModelSource, TraceabilityAnalyzer};

use crate::config::ServerConfig;
use crate::dispatcher::{DispatchOptions, Dispatcher};
use crate::error::StartupError;
use crate::handlers::elements::{GetAllElements, GetElementDetails, LocateElement};
use crate::handlers::graph::query_handlers;
use crate::handlers::jobs::{ImpactAnalysis, RebuildGraph};
use crate::handlers::sessions::GraphSessions;
use crate::handlers::{HandlerRegistry, SessionHandler};
use crate::hub::MessageHub;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<TraceabilityAnalyzer>,
    pub sessions: Arc<GraphSessions>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Builds the state around an existing model.
    pub fn new<M>(
        model: Arc<M>,
        hub: Arc<dyn MessageHub>,
        config: &ServerConfig,
        runtime: Handle,
    ) -> Self
    where
        M: ModelSource + EditorActions + 'static,
    {
        let source: Arc<dyn ModelSource> = model.clone();
        let editor: Arc<dyn EditorActions> = model;

        let analyzer = Arc::new(TraceabilityAnalyzer::new(
            Arc::clone(&source),
            BuildOptions {
                include_security: config.include_security,
            },
        ));
        let sessions = Arc::new(GraphSessions::new(Arc::clone(&analyzer), Arc::clone(&hub)));
        let registry = default_registry(&analyzer, source, editor, &sessions);

        let dispatcher = Dispatcher::new(
            registry,
            hub,
            DispatchOptions {
                max_concurrent_jobs: config.max_concurrent_jobs,
                include_trace: config.include_trace,
            },
            runtime,
        );

        AppState {
            analyzer,
            sessions,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Builds the state from configuration, loading the model snapshot named
    /// by `model_path` or starting from an empty model.
    pub fn from_config(
        config: &ServerConfig,
        hub: Arc<dyn MessageHub>,
        runtime: Handle,
    ) -> Result<Self, StartupError> {
        let model = match &config.model_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading model snapshot");
                InMemoryModel::from_json_file(path)?
            }
            None => {
                tracing::warn!("no model path configured, serving an empty model");
                InMemoryModel::new()
            }
        };
        Ok(Self::new(Arc::new(model), hub, config, runtime))
    }
}

/// Registers every built-in handler.
pub fn default_registry(
    analyzer: &Arc<TraceabilityAnalyzer>,
    source: Arc<dyn ModelSource>,
    editor: Arc<dyn EditorActions>,
    sessions: &Arc<GraphSessions>,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new()
        .with_rpc(Arc::new(GetAllElements::new(Arc::clone(&source))))
        .with_rpc(Arc::new(GetElementDetails::new(source)))
        .with_rpc(Arc::new(LocateElement::new(editor)))
        .with_job(Arc::new(RebuildGraph::new(
            Arc::clone(analyzer),
            Arc::clone(sessions),
        )))
        .with_job(Arc::new(ImpactAnalysis::new(Arc::clone(analyzer))))
        .with_session(Arc::clone(sessions) as Arc<dyn SessionHandler>);

    for handler in query_handlers(analyzer) {
        registry = registry.with_rpc(handler);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ChannelHub;

    #[tokio::test]
    async fn registers_every_command() {
        let (hub, _rx) = ChannelHub::unbounded();
        let state = AppState::new(
            Arc::new(InMemoryModel::new()),
            Arc::new(hub),
            &ServerConfig::default(),
            Handle::current(),
        );
        let registry = state.dispatcher.registry();
        assert_eq!(
            registry.rpc_methods(),
            vec![
                "findCommonDownstream",
                "findCommonUpstream",
                "findCycles",
                "findPaths",
                "getAllElements",
                "getElementDetails",
                "getReachable",
                "getSubgraph",
                "getTraceabilityGraph",
                "locateElement",
            ]
        );
        assert_eq!(registry.job_methods(), vec!["graph:impact", "graph:rebuild"]);
        assert_eq!(registry.channels(), vec!["graph"]);
    }

    #[tokio::test]
    async fn missing_snapshot_fails_startup() {
        let (hub, _rx) = ChannelHub::unbounded();
        let config = ServerConfig {
            model_path: Some("/definitely/not/here.json".into()),
            ..ServerConfig::default()
        };
        let err = AppState::from_config(&config, Arc::new(hub), Handle::current())
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::Model(_)));
    }
}
