//! Error types for the dispatcher and its handlers.
//!
//! [`DispatchError`] covers routing failures: the request could not be matched
//! to a handler. Its `Display` strings are part of the wire protocol and reach
//! the UI verbatim as `RPC_ERROR` messages.
//!
//! [`HandlerError`] is what a handler returns when it fails. It converts from
//! any `std::error::Error` (so `?` works on core and serde errors) and keeps
//! the source chain plus a captured backtrace for the optional `traceback`
//! field of error envelopes.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;

use crate::config::ConfigError;

/// Routing failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The `type` field was missing or named no known request kind.
    #[error("No handler for command type: {0}")]
    UnknownType(String),

    /// No RPC handler is registered under the method name.
    #[error("No RPC handler for '{0}'")]
    UnknownRpc(String),

    /// No job handler is registered under the method name.
    #[error("No Job handler for '{0}'")]
    UnknownJob(String),

    /// No session handler is registered for the channel.
    #[error("No session handler for '{0}'")]
    UnknownChannel(String),

    /// A field the request type requires was absent.
    #[error("missing required field '{field}' for {kind}")]
    MissingField { kind: &'static str, field: &'static str },

    /// The message was JSON but not a request object.
    #[error("invalid request: {0}")]
    Malformed(String),
}

/// A handler failure with its cause chain and backtrace.
pub struct HandlerError {
    message: String,
    causes: Vec<String>,
    backtrace: Backtrace,
}

impl HandlerError {
    /// Creates an error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        HandlerError {
            message: message.to_string(),
            causes: Vec::new(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Builds an error from a panic payload caught at a handler boundary.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("handler panicked: {s}")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("handler panicked: {s}")
        } else {
            "handler panicked".to_string()
        };
        HandlerError::msg(message)
    }

    /// The human-readable message sent to the UI.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the cause chain and backtrace as one diagnostic string.
    pub fn traceback(&self) -> String {
        let mut out = format!("Error: {}", self.message);
        for (depth, cause) in self.causes.iter().enumerate() {
            out.push_str(&format!("\n  {depth}: caused by: {cause}"));
        }
        out.push_str(&format!("\n\nBacktrace:\n{}", self.backtrace));
        out
    }

    /// `traceback()` if `include` is set.
    pub fn traceback_if(&self, include: bool) -> Option<String> {
        include.then(|| self.traceback())
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        HandlerError {
            message: err.to_string(),
            causes,
            backtrace: Backtrace::capture(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("message", &self.message)
            .field("causes", &self.causes)
            .finish()
    }
}

/// Failures while starting the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot load model: {0}")]
    Model(#[from] tracegraph_core::CoreError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_messages_match_the_protocol() {
        assert_eq!(
            DispatchError::UnknownType("PING".into()).to_string(),
            "No handler for command type: PING"
        );
        assert_eq!(
            DispatchError::UnknownRpc("nope".into()).to_string(),
            "No RPC handler for 'nope'"
        );
        assert_eq!(
            DispatchError::UnknownJob("nope".into()).to_string(),
            "No Job handler for 'nope'"
        );
        assert_eq!(
            DispatchError::UnknownChannel("x".into()).to_string(),
            "No session handler for 'x'"
        );
    }

    #[test]
    fn converts_errors_with_their_chain() {
        let core = tracegraph_core::CoreError::Io {
            path: "/tmp/model.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let err = HandlerError::from(core);
        assert!(err.message().contains("/tmp/model.json"));
        let trace = err.traceback();
        assert!(trace.starts_with("Error: "));
        assert!(trace.contains("caused by: gone"));
        assert!(trace.contains("Backtrace:"));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let err = HandlerError::from_panic(Box::new("kaboom"));
        assert_eq!(err.message(), "handler panicked: kaboom");
        let err = HandlerError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.message(), "handler panicked: owned");
        let err = HandlerError::from_panic(Box::new(42_u8));
        assert_eq!(err.message(), "handler panicked");
    }

    #[test]
    fn traceback_is_optional() {
        let err = HandlerError::msg("boom");
        assert!(err.traceback_if(false).is_none());
        assert!(err.traceback_if(true).unwrap().contains("boom"));
    }
}
