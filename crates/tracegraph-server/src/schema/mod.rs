//! Wire types for the message protocol.
//!
//! [`request`] holds the inbound message shape, [`envelope`] the outbound
//! ones, and [`graph`] the params and results of the graph commands. All
//! types use serde derives with camelCase field names.

pub mod envelope;
pub mod graph;
pub mod progress;
pub mod request;

pub use envelope::Envelope;
pub use progress::ProgressUpdate;
pub use request::{Request, RequestType};
