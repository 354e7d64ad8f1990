//! Traceability graph CLI.
//!
//! Provides the `tracegraph` binary for querying a model snapshot from the
//! shell and for running the stdio server. Queries go through the same
//! `TraceabilityAnalyzer` the server uses, so results are identical to what
//! the UI receives; output is the JSON `data` an RPC would return.
//!
//! Exit codes: 0 = success, 1 = query failure, 2 = configuration error,
//! 3 = model could not be loaded.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use tracegraph_core::{
    element_catalogue, BuildOptions, CoreError, Direction, InMemoryModel, TraceabilityAnalyzer,
};
use tracegraph_server::config::ServerConfig;
use tracegraph_server::transport::run_stdio;
use tracing_subscriber::EnvFilter;

/// Traceability analysis over page and microflow models.
#[derive(Parser)]
#[command(name = "tracegraph", about = "Traceability graph queries and server")]
struct Cli {
    /// JSON model snapshot to analyse.
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    /// Leave user and module roles out of the graph.
    #[arg(long, global = true)]
    no_security: bool,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Query(Query),

    /// Run the newline-delimited JSON server on stdin/stdout.
    Serve {
        /// Maximum number of jobs running at once.
        #[arg(long)]
        max_jobs: Option<usize>,
    },
}

/// Graph queries against a model snapshot.
#[derive(Subcommand)]
enum Query {
    /// Print the full graph.
    Graph,

    /// Print every page and microflow, sorted by id.
    Elements,

    /// Shortest path between two nodes.
    Path { from: String, to: String },

    /// Nodes that reach every given node.
    Upstream {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Nodes reachable from every given node.
    Downstream {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// The given nodes and the edges among them.
    Subgraph {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Ids reachable from the given nodes.
    Reachable {
        #[arg(required = true)]
        ids: Vec<String>,

        /// Follow edges against their direction.
        #[arg(long)]
        backward: bool,
    },

    /// Strongly connected groups of nodes.
    Cycles,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Serve { max_jobs } => run_serve(cli.model, cli.no_security, max_jobs),
        Commands::Query(query) => run_query(&cli.model, cli.no_security, cli.pretty, query),
    };
    process::exit(exit_code);
}

/// Execute the `serve` subcommand. Command-line flags override the
/// environment.
fn run_serve(model: Option<PathBuf>, no_security: bool, max_jobs: Option<usize>) -> i32 {
    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return 2;
        }
    };
    if model.is_some() {
        config.model_path = model;
    }
    if no_security {
        config.include_security = false;
    }
    if let Some(max_jobs) = max_jobs {
        config.max_concurrent_jobs = max_jobs.max(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: cannot start runtime: {err}");
            return 1;
        }
    };
    match runtime.block_on(run_stdio(config)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            3
        }
    }
}

/// Execute a query subcommand against a snapshot.
fn run_query(model: &Option<PathBuf>, no_security: bool, pretty: bool, query: Query) -> i32 {
    let Some(path) = model else {
        eprintln!("Error: --model <FILE> is required for queries");
        return 2;
    };
    let model = match InMemoryModel::from_json_file(path) {
        Ok(model) => {
            tracing::debug!(path = %path.display(), "loaded model snapshot");
            Arc::new(model)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            return 3;
        }
    };
    let analyzer = TraceabilityAnalyzer::new(
        model,
        BuildOptions {
            include_security: !no_security,
        },
    );

    let printed = match query {
        Query::Graph => print(analyzer.get_full_graph(), pretty),
        Query::Elements => print(element_catalogue(analyzer.source().as_ref()), pretty),
        Query::Path { from, to } => print(analyzer.find_paths(&from, &to), pretty),
        Query::Upstream { ids } => print(analyzer.find_common_upstream(&ids), pretty),
        Query::Downstream { ids } => print(analyzer.find_common_downstream(&ids), pretty),
        Query::Subgraph { ids } => print(analyzer.get_subgraph(&ids), pretty),
        Query::Reachable { ids, backward } => {
            let direction = if backward {
                Direction::Backward
            } else {
                Direction::Forward
            };
            print(analyzer.reachable(&ids, direction), pretty)
        }
        Query::Cycles => print(analyzer.find_cycles(), pretty),
    };
    match printed {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}

fn print<T: Serialize>(result: Result<T, CoreError>, pretty: bool) -> Result<(), String> {
    let value = result.map_err(|err| err.to_string())?;
    let json = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    println!("{}", json.map_err(|err| err.to_string())?);
    Ok(())
}
