//! CLI argument definitions using clap
//!
//! Commands:
//! - rendercause replay --trace <file.json> [--verbosity <level>]
//! - rendercause settings [--patch <file.json>]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DebugVerbosity;

/// rendercause - explains why UI tree nodes re-render
#[derive(Parser, Debug)]
#[command(name = "rendercause")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a recorded commit trace and print one verdict per render
    Replay {
        /// Path to the trace file
        #[arg(long)]
        trace: PathBuf,

        /// Diagnostic log level written to stderr (off, minimal, verbose, trace)
        #[arg(long, value_parser = parse_verbosity)]
        verbosity: Option<DebugVerbosity>,
    },

    /// Print the effective settings as JSON
    Settings {
        /// Partial settings to apply over the defaults
        #[arg(long)]
        patch: Option<PathBuf>,
    },
}

fn parse_verbosity(raw: &str) -> Result<DebugVerbosity, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown verbosity '{}'", raw))
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
