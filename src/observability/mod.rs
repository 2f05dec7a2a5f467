//! Observability for render-cause tracking
//!
//! This module provides:
//! - Structured logging (JSON), gated by `DebugVerbosity`
//! - Per-cycle metrics for an external benchmark sink
//! - Phase timing for the cycle state machine
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never alters control flow
//! 3. No background threads
//! 4. Deterministic output ordering
//!
//! # Usage
//!
//! ```ignore
//! use rendercause::observability::{Event, Logger, PhaseTimer, Phase};
//!
//! let logger = Logger::new(DebugVerbosity::Minimal);
//! logger.info(Event::CycleReceived, &[("nodes", "42")]);
//!
//! let mut timer = PhaseTimer::start();
//! timer.begin(Phase::Filter);
//! let durations = timer.finish();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{LogCapture, Logger, Severity};
pub use metrics::{
    BenchmarkSink, CycleMetrics, CycleOutcome, MemoryBenchmarkSink, NullSink, PhaseDurations,
};
pub use scope::{Phase, PhaseTimer};
