//! CLI module for rendercause
//!
//! Provides command-line interface for:
//! - replay: Run a recorded commit trace through an in-memory host
//! - settings: Print effective settings

mod args;
mod commands;
mod errors;
mod trace;

pub use args::{Cli, Command};
pub use commands::{replay, run, run_command, settings, REPLAY_FRAME_MS};
pub use errors::{CliError, CliResult, TraceError, TraceResult};
pub use trace::{apply_cycle, TraceCycle, TraceFile, TraceGeometry, TraceNode, TraceSlot, TraceState, TraceUpdate};
