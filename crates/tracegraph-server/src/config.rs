//! Server configuration read from environment variables.
//!
//! - `TRACEGRAPH_MODEL_PATH`: JSON model snapshot to serve (default: empty model)
//! - `TRACEGRAPH_MAX_JOBS`: concurrent job limit (default: 4)
//! - `TRACEGRAPH_INCLUDE_TRACE`: attach tracebacks to error envelopes
//!   (default: on in debug builds, off in release builds)
//! - `TRACEGRAPH_INCLUDE_SECURITY`: add the security layer to the graph
//!   (default: on)

use std::path::PathBuf;

pub const MODEL_PATH_VAR: &str = "TRACEGRAPH_MODEL_PATH";
pub const MAX_JOBS_VAR: &str = "TRACEGRAPH_MAX_JOBS";
pub const INCLUDE_TRACE_VAR: &str = "TRACEGRAPH_INCLUDE_TRACE";
pub const INCLUDE_SECURITY_VAR: &str = "TRACEGRAPH_INCLUDE_SECURITY";

/// An environment variable held a value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub model_path: Option<PathBuf>,
    pub max_concurrent_jobs: usize,
    pub include_trace: bool,
    pub include_security: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            model_path: None,
            max_concurrent_jobs: 4,
            include_trace: cfg!(debug_assertions),
            include_security: true,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` if it is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = ServerConfig::default();

        if let Some(path) = lookup(MODEL_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.model_path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup(MAX_JOBS_VAR) {
            config.max_concurrent_jobs = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError {
                        var: MAX_JOBS_VAR,
                        value,
                        reason: "expected a positive integer",
                    })
                }
            };
        }
        if let Some(value) = lookup(INCLUDE_TRACE_VAR) {
            config.include_trace = parse_flag(INCLUDE_TRACE_VAR, value)?;
        }
        if let Some(value) = lookup(INCLUDE_SECURITY_VAR) {
            config.include_security = parse_flag(INCLUDE_SECURITY_VAR, value)?;
        }
        Ok(config)
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            var,
            value,
            reason: "expected a boolean",
        }),
    }
}
