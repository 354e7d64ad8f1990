//! Binary entrypoint for the tracegraph stdio server.
//!
//! Reads configuration from environment variables (see
//! [`ServerConfig`](tracegraph_server::config::ServerConfig)) and log
//! filtering from `RUST_LOG`. Requests are read from stdin and envelopes
//! written to stdout, one JSON object per line; logs go to stderr.

use tracegraph_server::config::ServerConfig;
use tracegraph_server::transport::run_stdio;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let result = match ServerConfig::from_env() {
        Ok(config) => run_stdio(config).await,
        Err(err) => Err(err.into()),
    };
    if let Err(err) = result {
        tracing::error!(error = %err, "tracegraph server failed");
        std::process::exit(1);
    }
}
