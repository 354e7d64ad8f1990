//! The `graph` session channel.
//!
//! UI panels that render the graph connect here. Each connection gets a
//! welcome event with the current graph size (or `null` counts when nothing
//! has been built yet; connecting never triggers a build). Rebuild jobs use
//! [`GraphSessions::notify_all`] to push fresh summaries to every panel.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde_json::{json, Value};
use tracegraph_core::TraceabilityAnalyzer;

use super::SessionHandler;
use crate::hub::MessageHub;

pub const GRAPH_CHANNEL: &str = "graph";

pub struct GraphSessions {
    analyzer: Arc<TraceabilityAnalyzer>,
    hub: Arc<dyn MessageHub>,
    sessions: DashMap<String, Instant>,
}

impl GraphSessions {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>, hub: Arc<dyn MessageHub>) -> Self {
        GraphSessions {
            analyzer,
            hub,
            sessions: DashMap::new(),
        }
    }

    /// Connected session ids, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn is_connected(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Pushes `data` to every connected session.
    pub fn notify_all(&self, data: Value) {
        for session_id in self.session_ids() {
            self.hub.push_to_session(&session_id, data.clone());
        }
    }

    fn welcome(&self) -> Value {
        match self.analyzer.cached_graph() {
            Some(graph) => json!({
                "event": "connected",
                "nodes": graph.node_count(),
                "edges": graph.edge_count(),
            }),
            None => json!({"event": "connected", "nodes": null, "edges": null}),
        }
    }
}

impl SessionHandler for GraphSessions {
    fn command_type(&self) -> &'static str {
        GRAPH_CHANNEL
    }

    fn on_connect(&self, session_id: &str, _payload: Option<Value>) {
        if self
            .sessions
            .insert(session_id.to_string(), Instant::now())
            .is_some()
        {
            tracing::debug!(session_id, "session reconnected");
        } else {
            tracing::info!(session_id, "session connected");
        }
        self.hub.push_to_session(session_id, self.welcome());
    }

    fn on_disconnect(&self, session_id: &str) {
        match self.sessions.remove(session_id) {
            Some((_, since)) => tracing::info!(
                session_id,
                connected_ms = since.elapsed().as_millis() as u64,
                "session disconnected"
            ),
            None => tracing::debug!(session_id, "disconnect for unknown session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ChannelHub;
    use crate::schema::Envelope;
    use tracegraph_core::{BuildOptions, InMemoryModel};

    fn sessions() -> (GraphSessions, tokio::sync::mpsc::UnboundedReceiver<Envelope>) {
        let model = InMemoryModel::new()
            .with_page("A.Home")
            .with_navigation("Responsive", "A.Home");
        let analyzer = Arc::new(TraceabilityAnalyzer::new(
            Arc::new(model),
            BuildOptions::default(),
        ));
        let (hub, rx) = ChannelHub::unbounded();
        (GraphSessions::new(analyzer, Arc::new(hub)), rx)
    }

    #[test]
    fn connect_pushes_a_welcome_without_building() {
        let (sessions, mut rx) = sessions();
        sessions.on_connect("s1", None);

        match rx.try_recv().unwrap() {
            Envelope::EventSession { session_id, data } => {
                assert_eq!(session_id, "s1");
                assert_eq!(data["event"], "connected");
                assert!(data["nodes"].is_null());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!sessions.analyzer.is_built());
    }

    #[test]
    fn welcome_reports_counts_once_built() {
        let (sessions, mut rx) = sessions();
        sessions.analyzer.graph().unwrap();
        sessions.on_connect("s1", Some(json!({"panel": "main"})));

        let Envelope::EventSession { data, .. } = rx.try_recv().unwrap() else {
            panic!("expected a session event");
        };
        assert_eq!(data["nodes"], 2);
        assert_eq!(data["edges"], 1);
    }

    #[test]
    fn connect_after_invalidate_does_not_rebuild() {
        let (sessions, mut rx) = sessions();
        sessions.analyzer.graph().unwrap();
        sessions.analyzer.invalidate();
        sessions.on_connect("s1", None);

        let Envelope::EventSession { data, .. } = rx.try_recv().unwrap() else {
            panic!("expected a session event");
        };
        assert!(data["nodes"].is_null());
        assert!(data["edges"].is_null());
        assert_eq!(sessions.analyzer.build_count(), 1);
        assert!(sessions.analyzer.cached_graph().is_none());
    }

    #[test]
    fn notify_reaches_connected_sessions_only() {
        let (sessions, mut rx) = sessions();
        sessions.on_connect("s1", None);
        sessions.on_connect("s2", None);
        sessions.on_disconnect("s1");
        sessions.on_disconnect("never-connected");
        while rx.try_recv().is_ok() {}

        sessions.notify_all(json!({"event": "rebuilt"}));
        let targets: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                Envelope::EventSession { session_id, .. } => Some(session_id),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec!["s2".to_string()]);
        assert_eq!(sessions.session_ids(), vec!["s2".to_string()]);
    }
}
