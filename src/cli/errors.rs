//! CLI-specific error types
//!
//! CLI errors are the only fatal errors in the crate: the binary prints them
//! to stderr and exits non-zero.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for trace loading and replay
pub type TraceResult<T> = Result<T, TraceError>;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// Errors in a recorded commit trace
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Failed to read trace {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid trace JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A cycle updates or commits a tag that was never mounted
    #[error("Cycle {cycle} references unknown tag {tag}")]
    UnknownTag { cycle: usize, tag: u64 },
}

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("Invalid settings: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Output failed: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to create tokio runtime: {0}")]
    Runtime(String),
}

impl CliError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Trace(_) => "RENDERCAUSE_CLI_TRACE_ERROR",
            CliError::Config(_) => "RENDERCAUSE_CLI_CONFIG_ERROR",
            CliError::Io(_) | CliError::Json(_) => "RENDERCAUSE_CLI_IO_ERROR",
            CliError::Runtime(_) => "RENDERCAUSE_CLI_RUNTIME_ERROR",
        }
    }
}
