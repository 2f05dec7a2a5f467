//! Structured JSON logger
//!
//! - One log line = one event
//! - Deterministic key ordering
//! - Synchronous, no buffering
//! - Gated by `DebugVerbosity`; warnings and errors always pass

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use serde_json::{Map, Value};

use super::events::Event;
use crate::config::DebugVerbosity;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Buffer orientation, slot walks
    Trace = 0,
    /// Per-node decisions
    Debug = 1,
    /// One line per cycle or lifecycle change
    Info = 2,
    /// Degraded diagnosis
    Warn = 3,
    /// A collaborator failed
    Error = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Lowest verbosity at which this severity is written
    pub fn required_verbosity(&self) -> DebugVerbosity {
        match self {
            Severity::Trace => DebugVerbosity::Trace,
            Severity::Debug => DebugVerbosity::Verbose,
            Severity::Info => DebugVerbosity::Minimal,
            Severity::Warn | Severity::Error => DebugVerbosity::Off,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Captured log lines, shared with the logger that writes them
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    lines: Rc<RefCell<Vec<String>>>,
}

impl LogCapture {
    /// Raw lines written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Lines parsed back into JSON
    pub fn entries(&self) -> Vec<Value> {
        self.lines
            .borrow()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Entries whose `event` field equals `event`
    pub fn events(&self, event: Event) -> Vec<Value> {
        self.entries()
            .into_iter()
            .filter(|entry| entry["event"] == event.as_str())
            .collect()
    }
}

#[derive(Debug, Clone)]
enum LogTarget {
    Stderr,
    Stdout,
    Capture(LogCapture),
}

/// A structured logger that writes JSON lines
///
/// Clones share the verbosity, so a settings change reaches every holder.
#[derive(Debug, Clone)]
pub struct Logger {
    verbosity: Rc<Cell<DebugVerbosity>>,
    target: LogTarget,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(DebugVerbosity::Off)
    }
}

impl Logger {
    /// Logger writing to stderr
    pub fn new(verbosity: DebugVerbosity) -> Self {
        Self {
            verbosity: Rc::new(Cell::new(verbosity)),
            target: LogTarget::Stderr,
        }
    }

    /// Logger writing to stdout
    pub fn stdout(verbosity: DebugVerbosity) -> Self {
        Self {
            verbosity: Rc::new(Cell::new(verbosity)),
            target: LogTarget::Stdout,
        }
    }

    /// Logger writing into memory, for tests and embedding hosts
    pub fn capturing(verbosity: DebugVerbosity) -> (Self, LogCapture) {
        let capture = LogCapture::default();
        let logger = Self {
            verbosity: Rc::new(Cell::new(verbosity)),
            target: LogTarget::Capture(capture.clone()),
        };
        (logger, capture)
    }

    /// Current verbosity
    pub fn verbosity(&self) -> DebugVerbosity {
        self.verbosity.get()
    }

    /// Change verbosity for this logger and all its clones
    pub fn set_verbosity(&self, verbosity: DebugVerbosity) {
        self.verbosity.set(verbosity);
    }

    /// Whether a line at `severity` would be written
    pub fn enabled(&self, severity: Severity) -> bool {
        let required = severity.required_verbosity();
        required == DebugVerbosity::Off || self.verbosity.get() >= required
    }

    /// Log an event at its default severity
    pub fn event(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(event.severity(), event, fields);
    }

    /// Log an event at an explicit severity
    ///
    /// Fields are output in deterministic order (alphabetical by key)
    pub fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }
        let line = Self::render(severity, event, fields);
        match &self.target {
            LogTarget::Stderr => Self::write_line(&mut io::stderr(), &line),
            LogTarget::Stdout => Self::write_line(&mut io::stdout(), &line),
            LogTarget::Capture(capture) => capture.lines.borrow_mut().push(line),
        }
    }

    fn render(severity: Severity, event: Event, fields: &[(&str, &str)]) -> String {
        // serde_json's default map is ordered by key
        let mut object = Map::new();
        for (key, value) in fields {
            object.insert((*key).to_string(), Value::String((*value).to_string()));
        }
        object.insert("event".to_string(), Value::String(event.as_str().to_string()));
        object.insert("severity".to_string(), Value::String(severity.as_str().to_string()));
        Value::Object(object).to_string()
    }

    fn write_line<W: Write>(writer: &mut W, line: &str) {
        // Logging must never affect control flow
        let _ = writeln!(writer, "{}", line);
        let _ = writer.flush();
    }

    /// Log at TRACE level
    pub fn trace(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at DEBUG level
    pub fn debug(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Debug, event, fields);
    }

    /// Log at INFO level
    pub fn info(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }
}
