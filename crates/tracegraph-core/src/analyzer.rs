//! TraceabilityAnalyzer: owns a model source and its lazily built graph.
//!
//! The graph is built on first use and shared as an `Arc<TraceGraph>`
//! snapshot afterwards. Construction is guarded by double-checked locking:
//! readers take the `RwLock` fast path, and a separate build mutex makes sure
//! concurrent first callers wait for one build instead of racing several.
//!
//! The cache is never patched in place. [`TraceabilityAnalyzer::invalidate`]
//! drops it and the next query rebuilds; queries already holding a snapshot
//! keep reading the old graph until they finish.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::builder::{BuildOptions, GraphBuilder};
use crate::error::CoreError;
use crate::graph::{GraphView, TraceGraph};
use crate::id::NodeId;
use crate::node::Node;
use crate::query::Direction;
use crate::source::ModelSource;

/// Graph analysis facade over one model source.
pub struct TraceabilityAnalyzer {
    source: Arc<dyn ModelSource>,
    options: BuildOptions,
    cache: RwLock<Option<Arc<TraceGraph>>>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl TraceabilityAnalyzer {
    pub fn new(source: Arc<dyn ModelSource>, options: BuildOptions) -> Self {
        TraceabilityAnalyzer {
            source,
            options,
            cache: RwLock::new(None),
            build_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    /// The model source this analyzer reads from.
    pub fn source(&self) -> &Arc<dyn ModelSource> {
        &self.source
    }

    // -----------------------------------------------------------------------
    // Cache lifecycle
    // -----------------------------------------------------------------------

    /// Returns the cached graph, building it if needed.
    pub fn graph(&self) -> Result<Arc<TraceGraph>, CoreError> {
        if let Some(graph) = self.cached_graph() {
            return Ok(graph);
        }

        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished the build while we waited.
        if let Some(graph) = self.cached_graph() {
            return Ok(graph);
        }

        let graph = Arc::new(GraphBuilder::new(self.source.as_ref(), self.options).build()?);
        self.builds.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "traceability graph cached"
        );

        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&graph));
        Ok(graph)
    }

    /// Drops the cached graph; the next query rebuilds it.
    pub fn invalidate(&self) {
        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::debug!("traceability graph invalidated");
    }

    /// Invalidates and rebuilds immediately.
    pub fn rebuild(&self) -> Result<Arc<TraceGraph>, CoreError> {
        self.invalidate();
        self.graph()
    }

    /// Returns `true` if a graph is currently cached.
    pub fn is_built(&self) -> bool {
        self.cached_graph().is_some()
    }

    /// Number of builds performed so far.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// The cached graph, if any. Never builds.
    pub fn cached_graph(&self) -> Option<Arc<TraceGraph>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The complete graph.
    pub fn get_full_graph(&self) -> Result<GraphView, CoreError> {
        Ok(self.graph()?.to_view())
    }

    /// At most one shortest path between two nodes; see [`TraceGraph::find_paths`].
    pub fn find_paths(&self, start: &str, end: &str) -> Result<Vec<Vec<Node>>, CoreError> {
        Ok(self.graph()?.find_paths(start, end))
    }

    /// Reachable ids from the seeds, seeds included.
    pub fn reachable<S: AsRef<str>>(
        &self,
        starts: &[S],
        direction: Direction,
    ) -> Result<Vec<NodeId>, CoreError> {
        Ok(self
            .graph()?
            .reachable_set(starts, direction)
            .into_iter()
            .collect())
    }

    pub fn find_common_upstream<S: AsRef<str>>(&self, ids: &[S]) -> Result<GraphView, CoreError> {
        Ok(self.graph()?.common_upstream(ids))
    }

    pub fn find_common_downstream<S: AsRef<str>>(&self, ids: &[S]) -> Result<GraphView, CoreError> {
        Ok(self.graph()?.common_downstream(ids))
    }

    pub fn get_subgraph<S: AsRef<str>>(&self, ids: &[S]) -> Result<GraphView, CoreError> {
        Ok(self.graph()?.subgraph(ids))
    }

    pub fn find_cycles(&self) -> Result<Vec<Vec<NodeId>>, CoreError> {
        Ok(self.graph()?.cycles())
    }
}
