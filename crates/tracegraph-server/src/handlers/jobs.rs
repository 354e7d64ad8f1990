//! Long-running graph jobs.
//!
//! - `graph:rebuild` drops the cached graph, rebuilds it from the model
//!   source and announces the new size on the `graph` channel.
//! - `graph:impact` computes the downstream impact of each requested node,
//!   reporting progress per node and honouring cancellation between nodes.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracegraph_core::{Direction, NodeId, TraceabilityAnalyzer};

use super::sessions::{GraphSessions, GRAPH_CHANNEL};
use super::{parse_params, to_data, JobHandler};
use crate::error::HandlerError;
use crate::jobs::JobContext;
use crate::schema::graph::{ImpactReport, NodeIdsParams, NodeImpact, RebuildSummary};
use crate::schema::ProgressUpdate;

pub struct RebuildGraph {
    analyzer: Arc<TraceabilityAnalyzer>,
    sessions: Arc<GraphSessions>,
}

impl RebuildGraph {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>, sessions: Arc<GraphSessions>) -> Self {
        Self { analyzer, sessions }
    }
}

impl JobHandler for RebuildGraph {
    fn command_type(&self) -> &'static str {
        "graph:rebuild"
    }

    fn run(&self, _params: Value, ctx: &JobContext) -> Result<Value, HandlerError> {
        let started = Instant::now();

        ctx.report_progress(
            ProgressUpdate::new(0.0, "Invalidating cached graph").with_stage("invalidate"),
        );
        self.analyzer.invalidate();
        ctx.check_cancelled()?;

        ctx.report_progress(ProgressUpdate::new(10.0, "Building graph").with_stage("build"));
        let graph = self.analyzer.graph()?;

        let summary = RebuildSummary {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        ctx.report_progress(
            ProgressUpdate::new(90.0, "Notifying sessions")
                .with_stage("notify")
                .with_meta("nodes", summary.nodes)
                .with_meta("edges", summary.edges),
        );
        ctx.hub()
            .broadcast(GRAPH_CHANNEL, json!({"nodes": summary.nodes, "edges": summary.edges}));
        self.sessions
            .notify_all(json!({"event": "rebuilt", "nodes": summary.nodes, "edges": summary.edges}));

        ctx.report_progress(ProgressUpdate::new(100.0, "Graph rebuilt").with_stage("done"));
        to_data(&summary)
    }
}

pub struct ImpactAnalysis {
    analyzer: Arc<TraceabilityAnalyzer>,
}

impl ImpactAnalysis {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl JobHandler for ImpactAnalysis {
    fn command_type(&self) -> &'static str {
        "graph:impact"
    }

    fn run(&self, params: Value, ctx: &JobContext) -> Result<Value, HandlerError> {
        let params: NodeIdsParams = parse_params(self.command_type(), params)?;
        let graph = self.analyzer.graph()?;
        let total = params.node_ids.len();

        let mut impacts = Vec::with_capacity(total);
        for (i, node_id) in params.node_ids.iter().enumerate() {
            ctx.check_cancelled()?;

            let mut affected: Vec<NodeId> = graph
                .reachable_set(std::slice::from_ref(node_id), Direction::Forward)
                .into_iter()
                .filter(|id| id.as_str() != node_id.as_str())
                .collect();
            affected.sort();

            ctx.report_progress(
                ProgressUpdate::new((i + 1) as f64 / total as f64 * 100.0, format!("Analyzed {node_id}"))
                    .with_stage("impact")
                    .with_meta("nodeId", node_id.as_str())
                    .with_meta("affected", affected.len()),
            );
            impacts.push(NodeImpact {
                node_id: node_id.clone(),
                affected,
            });
        }

        to_data(&ImpactReport {
            impacts,
            common: graph.common_downstream(&params.node_ids),
        })
    }
}
