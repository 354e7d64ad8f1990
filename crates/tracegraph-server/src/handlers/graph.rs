//! RPC handlers for the traceability graph queries.
//!
//! Each handler holds the shared analyzer and answers one method. The first
//! call of any of them builds the graph; later calls read the cached one.

use std::sync::Arc;

use serde_json::Value;
use tracegraph_core::TraceabilityAnalyzer;

use super::{parse_params, to_data, RpcHandler};
use crate::error::HandlerError;
use crate::schema::graph::{FindPathsParams, NodeIdsParams, ReachableParams};

/// `getTraceabilityGraph`: the whole graph.
pub struct GetTraceabilityGraph {
    analyzer: Arc<TraceabilityAnalyzer>,
}

impl GetTraceabilityGraph {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl RpcHandler for GetTraceabilityGraph {
    fn command_type(&self) -> &'static str {
        "getTraceabilityGraph"
    }

    fn execute(&self, _params: Value) -> Result<Value, HandlerError> {
        to_data(&self.analyzer.get_full_graph()?)
    }
}

/// `findPaths`: at most one shortest path, as a list of node lists.
pub struct FindPaths {
    analyzer: Arc<TraceabilityAnalyzer>,
}

impl FindPaths {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl RpcHandler for FindPaths {
    fn command_type(&self) -> &'static str {
        "findPaths"
    }

    fn execute(&self, params: Value) -> Result<Value, HandlerError> {
        let params: FindPathsParams = parse_params(self.command_type(), params)?;
        let paths = self
            .analyzer
            .find_paths(&params.start_node_id, &params.end_node_id)?;
        to_data(&paths)
    }
}

/// `findCommonUpstream`: nodes that reach every requested node.
pub struct FindCommonUpstream {
    analyzer: Arc<TraceabilityAnalyzer>,
}

impl FindCommonUpstream {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl RpcHandler for FindCommonUpstream {
    fn command_type(&self) -> &'static str {
        "findCommonUpstream"
    }

    fn execute(&self, params: Value) -> Result<Value, HandlerError> {
        let params: NodeIdsParams = parse_params(self.command_type(), params)?;
        to_data(&self.analyzer.find_common_upstream(&params.node_ids)?)
    }
}

/// `findCommonDownstream`: nodes reachable from every requested node.
pub struct FindCommonDownstream {
    analyzer: Arc<TraceabilityAnalyzer>,
}

impl FindCommonDownstream {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl RpcHandler for FindCommonDownstream {
    fn command_type(&self) -> &'static str {
        "findCommonDownstream"
    }

    fn execute(&self, params: Value) -> Result<Value, HandlerError> {
        let params: NodeIdsParams = parse_params(self.command_type(), params)?;
        to_data(&self.analyzer.find_common_downstream(&params.node_ids)?)
    }
}

/// `getSubgraph`: the requested nodes and the edges among them.
pub struct GetSubgraph {
    analyzer: Arc<TraceabilityAnalyzer>,
}

impl GetSubgraph {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl RpcHandler for GetSubgraph {
    fn command_type(&self) -> &'static str {
        "getSubgraph"
    }

    fn execute(&self, params: Value) -> Result<Value, HandlerError> {
        let params: NodeIdsParams = parse_params(self.command_type(), params)?;
        to_data(&self.analyzer.get_subgraph(&params.node_ids)?)
    }
}

/// `getReachable`: ids reachable from the seeds in one direction.
pub struct GetReachable {
    analyzer: Arc<TraceabilityAnalyzer>,
}

impl GetReachable {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl RpcHandler for GetReachable {
    fn command_type(&self) -> &'static str {
        "getReachable"
    }

    fn execute(&self, params: Value) -> Result<Value, HandlerError> {
        let params: ReachableParams = parse_params(self.command_type(), params)?;
        to_data(&self.analyzer.reachable(&params.node_ids, params.direction)?)
    }
}

/// `findCycles`: strongly connected groups, including self-loops.
pub struct FindCycles {
    analyzer: Arc<TraceabilityAnalyzer>,
}

impl FindCycles {
    pub fn new(analyzer: Arc<TraceabilityAnalyzer>) -> Self {
        Self { analyzer }
    }
}

impl RpcHandler for FindCycles {
    fn command_type(&self) -> &'static str {
        "findCycles"
    }

    fn execute(&self, _params: Value) -> Result<Value, HandlerError> {
        to_data(&self.analyzer.find_cycles()?)
    }
}

/// Every graph query handler over one analyzer.
pub fn query_handlers(analyzer: &Arc<TraceabilityAnalyzer>) -> Vec<Arc<dyn RpcHandler>> {
    vec![
        Arc::new(GetTraceabilityGraph::new(Arc::clone(analyzer))),
        Arc::new(FindPaths::new(Arc::clone(analyzer))),
        Arc::new(FindCommonUpstream::new(Arc::clone(analyzer))),
        Arc::new(FindCommonDownstream::new(Arc::clone(analyzer))),
        Arc::new(GetSubgraph::new(Arc::clone(analyzer))),
        Arc::new(GetReachable::new(Arc::clone(analyzer))),
        Arc::new(FindCycles::new(Arc::clone(analyzer))),
    ]
}
