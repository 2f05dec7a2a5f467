//! Phase timer for the per-cycle state machine
//!
//! Each `begin` closes the previous phase; `finish` closes the last one and
//! returns the accumulated durations.

use std::time::Instant;

use super::metrics::PhaseDurations;

/// Timed phases of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Filter,
    Measure,
    Track,
    Deliver,
}

/// Accumulates wall time per phase
#[derive(Debug)]
pub struct PhaseTimer {
    started: Instant,
    current: Option<(Phase, Instant)>,
    durations: PhaseDurations,
}

impl PhaseTimer {
    /// Start timing a cycle
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            current: None,
            durations: PhaseDurations::default(),
        }
    }

    /// Close the running phase (if any) and open `phase`
    pub fn begin(&mut self, phase: Phase) {
        self.close();
        self.current = Some((phase, Instant::now()));
    }

    fn close(&mut self) {
        if let Some((phase, at)) = self.current.take() {
            let ms = at.elapsed().as_secs_f64() * 1_000.0;
            let slot = match phase {
                Phase::Filter => &mut self.durations.filter_ms,
                Phase::Measure => &mut self.durations.measure_ms,
                Phase::Track => &mut self.durations.track_ms,
                Phase::Deliver => &mut self.durations.deliver_ms,
            };
            *slot += ms;
        }
    }

    /// Phase currently running
    pub fn current(&self) -> Option<Phase> {
        self.current.map(|(phase, _)| phase)
    }

    /// Close the running phase and return all durations
    pub fn finish(mut self) -> PhaseDurations {
        self.close();
        self.durations.total_ms = self.started.elapsed().as_secs_f64() * 1_000.0;
        self.durations
    }
}
