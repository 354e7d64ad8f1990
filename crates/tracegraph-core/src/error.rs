//! Core error types for tracegraph-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Missing
//! reference targets are not errors (they simply produce no edge); these
//! variants cover the failures that do abort an operation.

use std::path::PathBuf;

use thiserror::Error;

use crate::id::NodeId;

/// Core errors produced by the tracegraph-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The host model could not answer a listing request.
    #[error("model source failed: {reason}")]
    Source { reason: String },

    /// A node id was not present in the built graph.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// A model snapshot could not be parsed.
    #[error("invalid model snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A model snapshot file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Shorthand for [`CoreError::Source`].
    pub fn source_failed(reason: impl Into<String>) -> Self {
        CoreError::Source {
            reason: reason.into(),
        }
    }
}
