//! Background job execution.
//!
//! [`JobRunner`] owns every live job. Starting a job registers a
//! [`CancellationToken`] under a fresh [`JobId`] and spawns a task that waits
//! for a worker permit, then runs the handler on tokio's blocking pool. Job
//! handlers are synchronous and may take seconds (a full graph rebuild walks
//! the whole host model), so they never run on the async workers.
//!
//! # Lifecycle
//!
//! Every job that is started ends with exactly one terminal envelope:
//! `JOB_SUCCESS` with the handler's result, or `JOB_ERROR` when the handler
//! returns an error, panics, or observes cancellation. The job is removed
//! from the live table only after its terminal envelope has been sent.
//!
//! Cancellation is cooperative. [`JobRunner::cancel`] trips the token; a
//! handler notices through [`JobContext::is_cancelled`] or
//! [`JobContext::check_cancelled`]. A job cancelled while still waiting for
//! a permit never runs its handler.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;
use crate::handlers::JobHandler;
use crate::hub::MessageHub;
use crate::schema::{Envelope, ProgressUpdate};

/// Message of the `JOB_ERROR` sent for a cancelled job.
pub const CANCELLED_MESSAGE: &str = "job cancelled";

/// Identifies one job run, `job-<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// A fresh, globally unique id.
    pub fn generate() -> Self {
        JobId(format!("job-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// JobContext
// ---------------------------------------------------------------------------

/// Handed to a running job handler.
pub struct JobContext {
    job_id: JobId,
    hub: Arc<dyn MessageHub>,
    cancel: CancellationToken,
}

impl JobContext {
    pub fn new(job_id: JobId, hub: Arc<dyn MessageHub>, cancel: CancellationToken) -> Self {
        JobContext {
            job_id,
            hub,
            cancel,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// The hub, for handlers that broadcast besides reporting progress.
    pub fn hub(&self) -> &Arc<dyn MessageHub> {
        &self.hub
    }

    /// Emits a `JOB_PROGRESS` envelope for this job.
    pub fn report_progress(&self, update: ProgressUpdate) {
        self.hub.send(Envelope::JobProgress {
            job_id: self.job_id.clone(),
            progress: update,
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the cancellation error once the job has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), HandlerError> {
        if self.is_cancelled() {
            Err(HandlerError::msg(CANCELLED_MESSAGE))
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// JobRunner
// ---------------------------------------------------------------------------

pub struct JobRunner {
    runtime: Handle,
    hub: Arc<dyn MessageHub>,
    permits: Arc<Semaphore>,
    live: Arc<DashMap<JobId, CancellationToken>>,
    include_trace: bool,
}

impl JobRunner {
    /// Creates a runner that spawns onto `runtime` and runs at most
    /// `max_concurrent` handlers at a time.
    pub fn new(
        runtime: Handle,
        hub: Arc<dyn MessageHub>,
        max_concurrent: usize,
        include_trace: bool,
    ) -> Self {
        JobRunner {
            runtime,
            hub,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            live: Arc::new(DashMap::new()),
            include_trace,
        }
    }

    /// Starts `handler` under `job_id`. The caller sends `JOB_STARTED` first.
    pub fn start(
        &self,
        job_id: JobId,
        handler: Arc<dyn JobHandler>,
        params: Value,
    ) -> JoinHandle<()> {
        let token = CancellationToken::new();
        self.live.insert(job_id.clone(), token.clone());

        let hub = Arc::clone(&self.hub);
        let permits = Arc::clone(&self.permits);
        let live = Arc::clone(&self.live);
        let include_trace = self.include_trace;

        self.runtime.spawn(async move {
            let method = handler.command_type();
            let outcome = match permits.acquire_owned().await {
                Err(_) => Err(HandlerError::msg("job runner shut down")),
                Ok(_) if token.is_cancelled() => Err(HandlerError::msg(CANCELLED_MESSAGE)),
                Ok(permit) => {
                    tracing::debug!(job_id = %job_id, method, "job running");
                    let ctx = JobContext::new(job_id.clone(), Arc::clone(&hub), token.clone());
                    let joined =
                        tokio::task::spawn_blocking(move || handler.run(params, &ctx)).await;
                    drop(permit);
                    match joined {
                        Ok(result) => result,
                        Err(err) if err.is_panic() => Err(HandlerError::from_panic(err.into_panic())),
                        Err(err) => Err(HandlerError::msg(format!("job aborted: {err}"))),
                    }
                }
            };

            let terminal = match outcome {
                Ok(data) => {
                    tracing::info!(job_id = %job_id, method, "job succeeded");
                    Envelope::JobSuccess {
                        job_id: job_id.clone(),
                        data,
                    }
                }
                Err(err) => {
                    tracing::warn!(job_id = %job_id, method, error = %err, "job failed");
                    Envelope::JobError {
                        job_id: job_id.clone(),
                        message: err.message().to_string(),
                        traceback: err.traceback_if(include_trace),
                    }
                }
            };
            hub.send(terminal);
            live.remove(&job_id);
        })
    }

    /// Requests cancellation of a live job. Returns `false` if the job is
    /// unknown or already finished.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        match self.live.get(job_id) {
            Some(token) => {
                token.cancel();
                tracing::info!(job_id = %job_id, "job cancellation requested");
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, job_id: &JobId) -> bool {
        self.live.contains_key(job_id)
    }

    /// Number of jobs started but not yet finished.
    pub fn live_jobs(&self) -> usize {
        self.live.len()
    }

    /// Waits until no jobs are live or `timeout` elapses. Returns `true` if
    /// the runner drained.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.live.is_empty() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}
