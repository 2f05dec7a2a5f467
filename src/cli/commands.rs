//! CLI command implementations
//!
//! `replay` drives a `RenderCauseContext` over a `MemoryHost` on a
//! current-thread tokio runtime. Output is JSON lines on stdout; diagnostic
//! logs go to stderr.

use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use serde_json::json;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::trace::{apply_cycle, TraceFile};
use crate::clock::ManualClock;
use crate::config::{DebugVerbosity, Settings, SettingsPatch};
use crate::context::ContextBuilder;
use crate::host::MemoryHost;
use crate::observability::Logger;
use crate::pipeline::Highlight;

/// Milliseconds between replayed cycles
pub const REPLAY_FRAME_MS: i64 = 16;

/// Parse arguments and run
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cmd {
        Command::Replay { trace, verbosity } => {
            let trace = TraceFile::load(&trace)?;
            let logger = Logger::new(DebugVerbosity::Off);
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| CliError::Runtime(e.to_string()))?;
            rt.block_on(replay(&trace, verbosity, logger, &mut out))
        }
        Command::Settings { patch } => settings(patch.as_deref(), &mut out),
    }
}

/// Replay `trace` and write one verdict line per tracked render, then stats
pub async fn replay<W: Write>(
    trace: &TraceFile,
    verbosity: Option<DebugVerbosity>,
    logger: Logger,
    out: &mut W,
) -> CliResult<()> {
    let mut patch = trace.settings.clone().unwrap_or_default();
    if verbosity.is_some() {
        patch.debug_verbosity = verbosity;
    }
    let settings = Settings::default().with(&patch);

    let host = MemoryHost::new();
    let clock = ManualClock::new(0);
    let mut ctx = ContextBuilder::new()
        .settings(settings)
        .filters(trace.filters.clone().unwrap_or_default())
        .logger(logger)
        .clock(Rc::new(clock.clone()))
        .build(host.clone());

    let drawn: Rc<RefCell<Vec<Highlight>>> = Rc::default();
    let sink = drawn.clone();
    ctx.set_highlight_callback(Box::new(move |highlights| {
        sink.borrow_mut().extend_from_slice(highlights);
        Ok(())
    }));
    ctx.init();

    for (index, cycle) in trace.cycles.iter().enumerate() {
        let (root, nodes) = apply_cycle(&host, index, cycle)?;
        ctx.sync_roots();
        host.commit(root, nodes);
        clock.advance(REPLAY_FRAME_MS);

        for metrics in ctx.process_pending().await {
            for highlight in drawn.borrow_mut().drain(..) {
                let Some(record) = ctx.get(highlight.id) else {
                    continue;
                };
                let line = json!({
                    "cycle": metrics.cycle,
                    "tag": record.tag,
                    "viewType": record.view_type,
                    "displayName": record.display_name,
                    "renderCount": record.render_count,
                    "color": record.color,
                    "cause": record.last_cause,
                });
                serde_json::to_writer(&mut *out, &line)?;
                writeln!(out)?;
            }
        }
    }

    let summary = json!({ "cycles": ctx.cycles(), "stats": ctx.stats() });
    serde_json::to_writer(&mut *out, &summary)?;
    writeln!(out)?;
    out.flush()?;
    ctx.dispose();
    Ok(())
}

/// Print the default settings, optionally patched from a file
pub fn settings<W: Write>(patch: Option<&Path>, out: &mut W) -> CliResult<()> {
    let mut settings = Settings::default();
    if let Some(path) = patch {
        let content = fs::read_to_string(path)?;
        let patch: SettingsPatch = serde_json::from_str(&content)?;
        settings.apply(&patch);
    }
    writeln!(out, "{}", settings.to_json()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn lines(out: Vec<u8>) -> Vec<Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_replay_prints_verdicts_and_stats() {
        let trace = TraceFile::parse(
            r#"{
                "cycles": [
                    { "mount": [ { "tag": 42, "viewType": "RCTView", "props": { "value": 1 } } ] },
                    { "update": [ { "tag": 42, "props": { "value": 2 } } ] }
                ]
            }"#,
        )
        .unwrap();
        let mut out = Vec::new();
        replay(&trace, None, Logger::default(), &mut out).await.unwrap();

        let lines = lines(out);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["cause"]["nativeCause"], "Mount");
        assert_eq!(lines[1]["cause"]["nativeCause"], "InputChange");
        assert_eq!(lines[1]["cause"]["changedInputKeys"], json!(["value"]));
        assert_eq!(lines[1]["renderCount"], 2);
        assert_eq!(lines[2]["cycles"], 2);
    }

    #[test]
    fn test_settings_command() {
        let mut out = Vec::new();
        settings(None, &mut out).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["batchSize"], 150);
    }
}
