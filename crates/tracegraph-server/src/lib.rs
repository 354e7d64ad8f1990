//! Message dispatcher and traceability services for the tracegraph backend.
//!
//! The host UI talks to the backend over a newline-delimited JSON stream.
//! Each inbound [`Request`](schema::Request) is routed by the
//! [`Dispatcher`](dispatcher::Dispatcher) to an RPC, job or session handler,
//! and every reply, progress report and event leaves through a
//! [`MessageHub`](hub::MessageHub) as an [`Envelope`](schema::Envelope).
//!
//! Graph construction and queries live in `tracegraph-core`; this crate holds
//! the protocol, handler plumbing, job runner and server binary.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod jobs;
pub mod schema;
pub mod state;
pub mod transport;
