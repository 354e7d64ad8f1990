//! Request routing.
//!
//! [`Dispatcher::dispatch`] is synchronous and never fails from the caller's
//! point of view: every outcome is reported through the hub, or logged when
//! there is nobody to report it to.
//!
//! # Routing
//!
//! | request              | behaviour                                        |
//! |----------------------|--------------------------------------------------|
//! | `RPC`                | runs inline, replies `RPC_SUCCESS` / `RPC_ERROR` |
//! | `JOB_START`          | replies `JOB_STARTED`, then runs on the runner   |
//! | `JOB_CANCEL`         | replies `RPC_SUCCESS {cancelled}`                |
//! | `SESSION_CONNECT`    | calls the channel's `on_connect`                 |
//! | `SESSION_DISCONNECT` | calls the channel's `on_disconnect`              |
//!
//! Routing failures (unknown type or method, missing fields) are answered
//! with an `RPC_ERROR` when the request carried a `reqId` and only logged
//! otherwise. Session messages have no reply: an unknown channel or a
//! missing `sessionId` is only logged. Handler failures, including panics, are contained here
//! and never take the dispatch loop down.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{DispatchError, HandlerError};
use crate::handlers::HandlerRegistry;
use crate::hub::MessageHub;
use crate::jobs::{JobId, JobRunner};
use crate::schema::{Envelope, Request, RequestType};

/// Knobs the dispatcher reads at construction.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub max_concurrent_jobs: usize,
    pub include_trace: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        DispatchOptions {
            max_concurrent_jobs: 4,
            include_trace: cfg!(debug_assertions),
        }
    }
}

pub struct Dispatcher {
    registry: HandlerRegistry,
    hub: Arc<dyn MessageHub>,
    jobs: JobRunner,
    include_trace: bool,
}

impl Dispatcher {
    /// Creates a dispatcher. Jobs are spawned onto `runtime`.
    pub fn new(
        registry: HandlerRegistry,
        hub: Arc<dyn MessageHub>,
        options: DispatchOptions,
        runtime: Handle,
    ) -> Self {
        let jobs = JobRunner::new(
            runtime,
            Arc::clone(&hub),
            options.max_concurrent_jobs,
            options.include_trace,
        );
        Dispatcher {
            registry,
            hub,
            jobs,
            include_trace: options.include_trace,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn jobs(&self) -> &JobRunner {
        &self.jobs
    }

    /// Routes one raw JSON message.
    pub fn dispatch_value(&self, value: Value) {
        match serde_json::from_value::<Request>(value.clone()) {
            Ok(request) => {
                self.dispatch(request);
            }
            Err(err) => {
                let req_id = value.get("reqId").and_then(Value::as_str);
                self.routing_failed(req_id, DispatchError::Malformed(err.to_string()));
            }
        }
    }

    /// Routes one request. Returns the job task for `JOB_START` requests
    /// that started a job.
    pub fn dispatch(&self, request: Request) -> Option<JoinHandle<()>> {
        let Some(kind) = request.request_type() else {
            let kind = request.kind.clone().unwrap_or_else(|| "<missing>".to_string());
            self.routing_failed(request.req_id.as_deref(), DispatchError::UnknownType(kind));
            return None;
        };

        tracing::debug!(
            kind = kind.as_str(),
            method = request.method.as_deref().unwrap_or(""),
            req_id = request.req_id.as_deref().unwrap_or(""),
            "dispatching"
        );

        match kind {
            RequestType::Rpc => {
                self.handle_rpc(request);
                None
            }
            RequestType::JobStart => self.handle_job_start(request),
            RequestType::JobCancel => {
                self.handle_job_cancel(request);
                None
            }
            RequestType::SessionConnect | RequestType::SessionDisconnect => {
                self.handle_session(kind, request);
                None
            }
        }
    }

    /// Waits for live jobs to finish, up to `timeout`.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.jobs.drain(timeout).await
    }

    // -----------------------------------------------------------------------
    // Per-type handling
    // -----------------------------------------------------------------------

    fn handle_rpc(&self, request: Request) {
        let Some(req_id) = request.req_id else {
            self.routing_failed(None, missing(RequestType::Rpc, "reqId"));
            return;
        };
        let method = request.method.unwrap_or_default();
        let Some(handler) = self.registry.rpc(&method) else {
            self.routing_failed(Some(&req_id), DispatchError::UnknownRpc(method));
            return;
        };

        let params = request.params.unwrap_or(Value::Null);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.execute(params)))
            .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)));

        let envelope = match outcome {
            Ok(data) => Envelope::RpcSuccess { req_id, data },
            Err(err) => {
                tracing::warn!(%method, %req_id, error = %err, "rpc failed");
                Envelope::RpcError {
                    req_id,
                    message: err.message().to_string(),
                    traceback: err.traceback_if(self.include_trace),
                }
            }
        };
        self.hub.send(envelope);
    }

    fn handle_job_start(&self, request: Request) -> Option<JoinHandle<()>> {
        let Some(req_id) = request.req_id else {
            self.routing_failed(None, missing(RequestType::JobStart, "reqId"));
            return None;
        };
        let method = request.method.unwrap_or_default();
        let Some(handler) = self.registry.job(&method) else {
            self.routing_failed(Some(&req_id), DispatchError::UnknownJob(method));
            return None;
        };

        let job_id = JobId::generate();
        tracing::info!(%method, %req_id, %job_id, "job started");
        self.hub.send(Envelope::JobStarted {
            req_id,
            job_id: job_id.clone(),
        });
        Some(self.jobs.start(
            job_id,
            Arc::clone(handler),
            request.params.unwrap_or(Value::Null),
        ))
    }

    fn handle_job_cancel(&self, request: Request) {
        let Some(req_id) = request.req_id else {
            self.routing_failed(None, missing(RequestType::JobCancel, "reqId"));
            return;
        };
        let Some(job_id) = request.job_id else {
            self.routing_failed(Some(&req_id), missing(RequestType::JobCancel, "jobId"));
            return;
        };

        let cancelled = self.jobs.cancel(&job_id);
        self.hub.send(Envelope::RpcSuccess {
            req_id,
            data: json!({ "cancelled": cancelled }),
        });
    }

    fn handle_session(&self, kind: RequestType, request: Request) {
        let Some(session_id) = request.session_id.as_deref() else {
            tracing::warn!(error = %missing(kind, "sessionId"), "ignoring session message");
            return;
        };
        let channel = request.channel.as_deref().unwrap_or_default();
        let Some(handler) = self.registry.session(channel) else {
            tracing::debug!(
                session_id,
                error = %DispatchError::UnknownChannel(channel.to_string()),
                "ignoring session message"
            );
            return;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match kind {
            RequestType::SessionConnect => handler.on_connect(session_id, request.payload.clone()),
            _ => handler.on_disconnect(session_id),
        }));
        if let Err(payload) = outcome {
            let err = HandlerError::from_panic(payload);
            tracing::error!(channel, session_id, error = %err, "session handler panicked");
        }
    }

    fn routing_failed(&self, req_id: Option<&str>, err: DispatchError) {
        match req_id {
            Some(req_id) => {
                tracing::warn!(req_id, error = %err, "cannot route request");
                self.hub.send(Envelope::RpcError {
                    req_id: req_id.to_string(),
                    message: err.to_string(),
                    traceback: None,
                });
            }
            None => tracing::error!(error = %err, "cannot route request without reqId"),
        }
    }
}

fn missing(kind: RequestType, field: &'static str) -> DispatchError {
    DispatchError::MissingField {
        kind: kind.as_str(),
        field,
    }
}
