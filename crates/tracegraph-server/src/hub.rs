//! The outbound message hub.
//!
//! A [`MessageHub`] is the single sink for every envelope the backend emits.
//! Implementations must be safe to call from any thread: RPC replies are
//! sent from the dispatch loop while job progress arrives from worker
//! threads. Sending never fails from the caller's point of view; transport
//! errors are logged and dropped.
//!
//! Two hubs are provided: [`WriterHub`] writes newline-delimited JSON to any
//! `Write` (stdout in the server binary) and [`ChannelHub`] forwards
//! envelopes into a tokio channel for in-process consumers and tests.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::schema::Envelope;

pub trait MessageHub: Send + Sync {
    fn send(&self, envelope: Envelope);

    /// Sends an `EVENT_BROADCAST` to every listener of `channel`.
    fn broadcast(&self, channel: &str, data: Value) {
        self.send(Envelope::EventBroadcast {
            channel: channel.to_string(),
            data,
        });
    }

    /// Sends an `EVENT_SESSION` to one session.
    fn push_to_session(&self, session_id: &str, data: Value) {
        self.send(Envelope::EventSession {
            session_id: session_id.to_string(),
            data,
        });
    }
}

// ---------------------------------------------------------------------------
// WriterHub
// ---------------------------------------------------------------------------

/// Writes each envelope as one JSON line. The mutex keeps concurrent
/// senders from interleaving partial lines.
pub struct WriterHub<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterHub<W> {
    pub fn new(writer: W) -> Self {
        WriterHub {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> MessageHub for WriterHub<W> {
    fn send(&self, envelope: Envelope) {
        let line = match serde_json::to_string(&envelope) {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(kind = envelope.type_name(), %err, "cannot serialise envelope");
                return;
            }
        };

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            tracing::warn!(kind = envelope.type_name(), %err, "dropping envelope, write failed");
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelHub
// ---------------------------------------------------------------------------

/// Forwards envelopes into an unbounded tokio channel.
pub struct ChannelHub {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelHub {
    /// Creates a hub and the receiving end of its channel.
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelHub { tx }, rx)
    }
}

impl MessageHub for ChannelHub {
    fn send(&self, envelope: Envelope) {
        if let Err(err) = self.tx.send(envelope) {
            tracing::warn!(kind = err.0.type_name(), "dropping envelope, receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use std::sync::Arc;
    use std::thread;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_envelope() {
        let hub = WriterHub::new(Vec::new());
        hub.broadcast("graph", json!({"nodes": 1}));
        hub.push_to_session("s1", json!("hi"));

        let out = String::from_utf8(hub.into_inner()).unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "EVENT_BROADCAST");
        assert_eq!(lines[0]["channel"], "graph");
        assert_eq!(lines[1]["type"], "EVENT_SESSION");
        assert_eq!(lines[1]["sessionId"], "s1");
    }

    #[test]
    fn concurrent_sends_do_not_interleave() {
        let hub = Arc::new(WriterHub::new(Vec::new()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let hub = Arc::clone(&hub);
                thread::spawn(move || {
                    for j in 0..50 {
                        hub.broadcast("load", json!({"thread": i, "seq": j, "pad": "x".repeat(64)}));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let hub = Arc::try_unwrap(hub).ok().unwrap();
        let out = String::from_utf8(hub.into_inner()).unwrap();
        let parsed: Vec<Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed.len(), 400);
    }

    #[test]
    fn write_failures_are_swallowed() {
        let hub = WriterHub::new(BrokenPipe);
        hub.broadcast("graph", json!(null));
    }

    #[test]
    fn channel_hub_forwards_and_survives_a_closed_receiver() {
        let (hub, mut rx) = ChannelHub::unbounded();
        hub.broadcast("graph", json!(1));
        assert_eq!(rx.try_recv().unwrap().type_name(), "EVENT_BROADCAST");

        drop(rx);
        hub.broadcast("graph", json!(2));
    }
}
