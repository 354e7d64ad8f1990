//! Outbound envelopes.
//!
//! Everything the backend sends to the host UI is an [`Envelope`]: a JSON
//! object tagged by `type` with camelCase fields. Envelopes are serialised
//! one per line by [`WriterHub`](crate::hub::WriterHub).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::progress::ProgressUpdate;
use crate::jobs::JobId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    #[serde(rename_all = "camelCase")]
    RpcSuccess { req_id: String, data: Value },

    #[serde(rename_all = "camelCase")]
    RpcError {
        req_id: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        traceback: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    JobStarted { req_id: String, job_id: JobId },

    #[serde(rename_all = "camelCase")]
    JobProgress {
        job_id: JobId,
        progress: ProgressUpdate,
    },

    #[serde(rename_all = "camelCase")]
    JobSuccess { job_id: JobId, data: Value },

    #[serde(rename_all = "camelCase")]
    JobError {
        job_id: JobId,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        traceback: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    EventBroadcast { channel: String, data: Value },

    #[serde(rename_all = "camelCase")]
    EventSession { session_id: String, data: Value },
}

impl Envelope {
    /// The wire `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Envelope::RpcSuccess { .. } => "RPC_SUCCESS",
            Envelope::RpcError { .. } => "RPC_ERROR",
            Envelope::JobStarted { .. } => "JOB_STARTED",
            Envelope::JobProgress { .. } => "JOB_PROGRESS",
            Envelope::JobSuccess { .. } => "JOB_SUCCESS",
            Envelope::JobError { .. } => "JOB_ERROR",
            Envelope::EventBroadcast { .. } => "EVENT_BROADCAST",
            Envelope::EventSession { .. } => "EVENT_SESSION",
        }
    }

    pub fn req_id(&self) -> Option<&str> {
        match self {
            Envelope::RpcSuccess { req_id, .. }
            | Envelope::RpcError { req_id, .. }
            | Envelope::JobStarted { req_id, .. } => Some(req_id),
            _ => None,
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Envelope::JobStarted { job_id, .. }
            | Envelope::JobProgress { job_id, .. }
            | Envelope::JobSuccess { job_id, .. }
            | Envelope::JobError { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// `true` for the envelopes that end a job's lifecycle.
    pub fn is_job_terminal(&self) -> bool {
        matches!(self, Envelope::JobSuccess { .. } | Envelope::JobError { .. })
    }
}
