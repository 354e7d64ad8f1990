//! The newline-delimited JSON transport.
//!
//! The host bridge speaks one JSON object per line: requests arrive on
//! stdin, envelopes leave on stdout through a [`WriterHub`]. Logs go to
//! stderr so they never corrupt the stream.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::StartupError;
use crate::hub::{MessageHub, WriterHub};
use crate::state::AppState;

/// How long to wait for running jobs once input closes.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Reads requests line by line until EOF and dispatches each one. Returns
/// the number of lines dispatched.
pub async fn serve_lines<R>(reader: R, dispatcher: &Dispatcher) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                dispatcher.dispatch_value(value);
                served += 1;
            }
            Err(err) => tracing::warn!(%err, "ignoring malformed input line"),
        }
    }
    Ok(served)
}

/// Runs the stdio server until stdin closes.
pub async fn run_stdio(config: ServerConfig) -> Result<(), StartupError> {
    let hub: Arc<dyn MessageHub> = Arc::new(WriterHub::new(std::io::stdout()));
    let state = AppState::from_config(&config, hub, Handle::current())?;
    tracing::info!(
        max_jobs = config.max_concurrent_jobs,
        include_security = config.include_security,
        "tracegraph server ready on stdio"
    );

    let served = serve_lines(BufReader::new(tokio::io::stdin()), &state.dispatcher).await?;
    tracing::info!(served, "input closed, waiting for running jobs");
    if !state.dispatcher.drain(SHUTDOWN_GRACE).await {
        tracing::warn!(
            live = state.dispatcher.jobs().live_jobs(),
            "jobs still running at shutdown"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatchOptions;
    use crate::handlers::HandlerRegistry;
    use crate::hub::ChannelHub;
    use crate::schema::Envelope;

    #[tokio::test]
    async fn skips_blank_and_malformed_lines() {
        let (hub, mut rx) = ChannelHub::unbounded();
        let dispatcher = Dispatcher::new(
            HandlerRegistry::new(),
            Arc::new(hub),
            DispatchOptions::default(),
            Handle::current(),
        );
        let input = "\n{not json}\n{\"type\":\"RPC\",\"reqId\":\"r1\",\"method\":\"nope\"}\n   \n";

        let served = serve_lines(input.as_bytes(), &dispatcher).await.unwrap();
        assert_eq!(served, 1);
        match rx.try_recv().unwrap() {
            Envelope::RpcError { req_id, message, .. } => {
                assert_eq!(req_id, "r1");
                assert_eq!(message, "No RPC handler for 'nope'");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
