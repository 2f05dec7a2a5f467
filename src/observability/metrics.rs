//! Per-cycle metrics for the external benchmark sink
//!
//! - One record per cycle that reaches `Finished`
//! - Counts at each phase plus per-phase durations
//! - The core does not care whether a recording session is active

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// How a finished cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleOutcome {
    /// Highlights were produced and handed to the callback (if any)
    Delivered,
    /// Every node was filtered out as self-instrumentation
    EmptyAfterFilter,
    /// Nodes survived filtering but none survived measurement
    NothingToDraw,
    /// The highlight callback reported an error
    CallbackFailed,
}

/// Wall time spent in each phase, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDurations {
    pub filter_ms: f64,
    pub measure_ms: f64,
    pub track_ms: f64,
    pub deliver_ms: f64,
    pub total_ms: f64,
}

/// One structured metrics record per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleMetrics {
    /// Monotonic cycle number
    pub cycle: u64,
    /// Raw node references received
    pub nodes_received: usize,
    /// Nodes dropped as belonging to the overlay or this tool
    pub nodes_excluded: usize,
    /// Nodes dropped as duplicate tags within the cycle
    pub nodes_duplicate: usize,
    /// Nodes that survived filtering
    pub nodes_filtered: usize,
    /// Nodes admitted to measurement (capped by batch size)
    pub nodes_in_batch: usize,
    /// Nodes with usable geometry
    pub nodes_measured: usize,
    /// Nodes whose measurement failed or was incomplete
    pub measure_failures: usize,
    /// Nodes written to the store
    pub nodes_tracked: usize,
    /// Highlights handed to the overlay callback
    pub highlights_delivered: usize,
    pub durations: PhaseDurations,
    pub outcome: CycleOutcome,
}

impl CycleMetrics {
    /// Empty record for a cycle that is about to run
    pub fn new(cycle: u64, nodes_received: usize) -> Self {
        Self {
            cycle,
            nodes_received,
            nodes_excluded: 0,
            nodes_duplicate: 0,
            nodes_filtered: 0,
            nodes_in_batch: 0,
            nodes_measured: 0,
            measure_failures: 0,
            nodes_tracked: 0,
            highlights_delivered: 0,
            durations: PhaseDurations::default(),
            outcome: CycleOutcome::NothingToDraw,
        }
    }

    /// Serialize for sinks that take text
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Receiver of per-cycle metrics
pub trait BenchmarkSink {
    /// Record one finished cycle
    fn record(&mut self, metrics: &CycleMetrics);
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullSink;

impl BenchmarkSink for NullSink {
    fn record(&mut self, _metrics: &CycleMetrics) {}
}

/// Sink that keeps every record in memory; clones share storage
#[derive(Debug, Clone, Default)]
pub struct MemoryBenchmarkSink {
    records: Rc<RefCell<Vec<CycleMetrics>>>,
}

impl MemoryBenchmarkSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far
    pub fn records(&self) -> Vec<CycleMetrics> {
        self.records.borrow().clone()
    }

    /// Most recent record
    pub fn last(&self) -> Option<CycleMetrics> {
        self.records.borrow().last().cloned()
    }
}

impl BenchmarkSink for MemoryBenchmarkSink {
    fn record(&mut self, metrics: &CycleMetrics) {
        self.records.borrow_mut().push(metrics.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_zeroed() {
        let metrics = CycleMetrics::new(3, 12);
        assert_eq!(metrics.cycle, 3);
        assert_eq!(metrics.nodes_received, 12);
        assert_eq!(metrics.nodes_in_batch, 0);
        assert_eq!(metrics.durations, PhaseDurations::default());
    }

    #[test]
    fn test_to_json_uses_camel_case() {
        let mut metrics = CycleMetrics::new(1, 250);
        metrics.nodes_in_batch = 150;
        let parsed: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed["nodesReceived"], 250);
        assert_eq!(parsed["nodesInBatch"], 150);
        assert!(parsed["durations"]["totalMs"].is_number());
    }

    #[test]
    fn test_memory_sink_shares_records() {
        let sink = MemoryBenchmarkSink::new();
        let mut writer = sink.clone();
        writer.record(&CycleMetrics::new(1, 1));
        writer.record(&CycleMetrics::new(2, 1));
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.last().unwrap().cycle, 2);
    }
}
