//! Cycle state machine
//!
//! `Received -> Filtered -> Measured -> Tracked -> Delivered -> finish()`
//!
//! Each phase consumes the previous one, so phases cannot run out of order
//! or twice. Every path ends in `finish`, which emits the cycle's metrics.

use std::collections::HashSet;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use super::errors::CallbackResult;
use super::geometry::{Geometry, GeometryProvider};
use super::palette::{Palette, DEFAULT_HIGHLIGHT_COLOR};
use super::self_filter::SelfExclusionFilter;
use crate::attribution::{AttributionEngine, CycleScope};
use crate::config::Settings;
use crate::host::{HostAdapter, NodeTag};
use crate::observability::{
    BenchmarkSink, CycleMetrics, CycleOutcome, Event, Logger, Phase, PhaseTimer,
};
use crate::store::{IdentifyingAttributes, RenderTrackingStore, RenderUpdate};

/// One positioned, colored overlay rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: NodeTag,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub count: u64,
}

/// Overlay callback, invoked once per cycle with every highlight
pub type HighlightCallback = Box<dyn FnMut(&[Highlight]) -> CallbackResult>;

/// Metrics and timing carried through every phase
#[derive(Debug)]
struct CycleState {
    metrics: CycleMetrics,
    timer: PhaseTimer,
}

impl CycleState {
    fn finish(mut self, sink: &mut dyn BenchmarkSink, logger: &Logger) -> CycleMetrics {
        self.metrics.durations = self.timer.finish();
        sink.record(&self.metrics);
        logger.info(
            Event::CycleFinished,
            &[
                ("cycle", &self.metrics.cycle.to_string()),
                ("outcome", &format!("{:?}", self.metrics.outcome)),
                ("received", &self.metrics.nodes_received.to_string()),
                ("tracked", &self.metrics.nodes_tracked.to_string()),
                ("total_ms", &format!("{:.3}", self.metrics.durations.total_ms)),
            ],
        );
        self.metrics
    }
}

/// A surviving node with its color assignment
#[derive(Debug, Clone)]
struct Candidate<N> {
    node: N,
    tag: NodeTag,
    count: u64,
    color: String,
}

/// Raw node references for one cycle
#[derive(Debug)]
pub struct Received<N> {
    nodes: Vec<N>,
    state: CycleState,
}

impl<N: Clone> Received<N> {
    pub fn new(cycle: u64, nodes: Vec<N>) -> Self {
        let metrics = CycleMetrics::new(cycle, nodes.len());
        Self {
            nodes,
            state: CycleState {
                metrics,
                timer: PhaseTimer::start(),
            },
        }
    }

    /// Drop duplicates and self-instrumentation, assign colors
    pub fn filter<A: HostAdapter<Node = N>>(
        mut self,
        adapter: &A,
        self_filter: &mut SelfExclusionFilter,
        store: &RenderTrackingStore,
        palette: &Palette,
        settings: &Settings,
    ) -> Filtered<N> {
        self.state.timer.begin(Phase::Filter);
        let mut received = HashSet::new();
        let mut candidates = Vec::new();

        for node in self.nodes {
            let tag = adapter.tag(&node);
            if !received.insert(tag) {
                self.state.metrics.nodes_duplicate += 1;
                continue;
            }
            if self_filter.is_excluded(adapter, &node) {
                self.state.metrics.nodes_excluded += 1;
                continue;
            }
            let (count, color) = if settings.count_renders {
                let count = store.render_count(tag) + 1;
                (count, palette.color_for(count).to_string())
            } else {
                (0, DEFAULT_HIGHLIGHT_COLOR.to_string())
            };
            candidates.push(Candidate {
                node,
                tag,
                count,
                color,
            });
        }
        self.state.metrics.nodes_filtered = candidates.len();

        Filtered {
            received,
            candidates,
            state: self.state,
        }
    }
}

/// Nodes that survived filtering
#[derive(Debug)]
pub struct Filtered<N> {
    /// Every tag received this cycle, excluded ones included
    received: HashSet<NodeTag>,
    candidates: Vec<Candidate<N>>,
    state: CycleState,
}

impl<N: Clone> Filtered<N> {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// End the cycle early: everything was filtered out
    pub fn finish_empty(mut self, sink: &mut dyn BenchmarkSink, logger: &Logger) -> CycleMetrics {
        self.state.metrics.outcome = CycleOutcome::EmptyAfterFilter;
        self.state.finish(sink, logger)
    }

    /// Measure at most `batch_size` nodes concurrently and join
    pub async fn measure<G: GeometryProvider<N>>(
        mut self,
        geometry: &G,
        batch_size: usize,
        logger: &Logger,
    ) -> Measured<N> {
        self.state.timer.begin(Phase::Measure);
        self.candidates.truncate(batch_size);
        self.state.metrics.nodes_in_batch = self.candidates.len();

        let requests = self.candidates.iter().map(|c| geometry.measure(&c.node));
        let results = join_all(requests).await;

        let mut measured = Vec::with_capacity(self.candidates.len());
        for (candidate, result) in self.candidates.into_iter().zip(results) {
            match result.map(|raw| raw.resolve()) {
                Ok(Some(geometry)) => measured.push((candidate, geometry)),
                Ok(None) => {
                    self.state.metrics.measure_failures += 1;
                    logger.debug(
                        Event::MeasureFailed,
                        &[("tag", &candidate.tag.to_string()), ("error", "incomplete geometry")],
                    );
                }
                Err(err) => {
                    self.state.metrics.measure_failures += 1;
                    logger.debug(
                        Event::MeasureFailed,
                        &[("tag", &candidate.tag.to_string()), ("error", &err.to_string())],
                    );
                }
            }
        }
        self.state.metrics.nodes_measured = measured.len();

        Measured {
            received: self.received,
            measured,
            state: self.state,
        }
    }
}

/// Nodes with usable geometry
#[derive(Debug)]
pub struct Measured<N> {
    received: HashSet<NodeTag>,
    measured: Vec<(Candidate<N>, Geometry)>,
    state: CycleState,
}

impl<N: Clone> Measured<N> {
    /// Attribute every measured node and write it to the store in one batch
    pub fn track<A: HostAdapter<Node = N>>(
        mut self,
        adapter: &A,
        engine: &mut AttributionEngine,
        store: &mut RenderTrackingStore,
        settings: &Settings,
        timestamp: i64,
        logger: &Logger,
    ) -> Tracked {
        self.state.timer.begin(Phase::Track);
        let scope = CycleScope {
            cycle: self.state.metrics.cycle,
            batch: &self.received,
            attribute_causes: settings.attribute_causes,
            timestamp,
        };

        let mut highlights = Vec::with_capacity(self.measured.len());
        store.begin_batch();
        for (candidate, geometry) in self.measured {
            let attribution = engine.attribute(adapter, &candidate.node, &scope);
            let current = &attribution.current;
            let snapshot = &attribution.snapshot;

            let view_type = adapter
                .view_type(current)
                .or_else(|| adapter.display_name(current))
                .unwrap_or_else(|| "Unknown".to_string());
            let inputs = if settings.capture_inputs {
                snapshot.props.clone()
            } else {
                None
            };
            let state = if settings.capture_state {
                snapshot.state.as_ref().map(|s| s.to_value())
            } else {
                None
            };

            store.track_render(RenderUpdate {
                tag: candidate.tag,
                view_type,
                display_name: adapter.display_name(current),
                attributes: IdentifyingAttributes::from_inputs(snapshot.props.as_ref()),
                owner_name: attribution.verdict.owner_name.clone(),
                geometry: Some(geometry),
                color: candidate.color.clone(),
                cause: attribution.verdict,
                inputs,
                state,
            });
            highlights.push(Highlight {
                id: candidate.tag,
                x: geometry.x,
                y: geometry.y,
                width: geometry.width,
                height: geometry.height,
                color: candidate.color,
                count: candidate.count,
            });
        }
        store.end_batch();

        self.state.metrics.nodes_tracked = highlights.len();
        logger.debug(
            Event::CycleTracked,
            &[
                ("cycle", &self.state.metrics.cycle.to_string()),
                ("tracked", &highlights.len().to_string()),
            ],
        );

        Tracked {
            highlights,
            state: self.state,
        }
    }
}

/// Nodes written to the store, with their highlights
#[derive(Debug)]
pub struct Tracked {
    highlights: Vec<Highlight>,
    state: CycleState,
}

impl Tracked {
    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    /// Hand the highlights to the overlay, if any survived and a callback is set
    pub fn deliver(mut self, callback: Option<&mut HighlightCallback>, logger: &Logger) -> Delivered {
        self.state.timer.begin(Phase::Deliver);
        self.state.metrics.outcome = CycleOutcome::NothingToDraw;

        if !self.highlights.is_empty() {
            self.state.metrics.outcome = CycleOutcome::Delivered;
            if let Some(callback) = callback {
                match callback(&self.highlights) {
                    Ok(()) => {
                        self.state.metrics.highlights_delivered = self.highlights.len();
                        logger.debug(
                            Event::HighlightsDelivered,
                            &[("count", &self.highlights.len().to_string())],
                        );
                    }
                    Err(err) => {
                        self.state.metrics.outcome = CycleOutcome::CallbackFailed;
                        logger.error(Event::HighlightCallbackFailed, &[("error", &err.to_string())]);
                    }
                }
            }
        }

        Delivered {
            highlights: self.highlights,
            state: self.state,
        }
    }
}

/// Final phase before `finish`
#[derive(Debug)]
pub struct Delivered {
    highlights: Vec<Highlight>,
    state: CycleState,
}

impl Delivered {
    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    /// Emit the cycle's metrics record
    pub fn finish(self, sink: &mut dyn BenchmarkSink, logger: &Logger) -> CycleMetrics {
        self.state.finish(sink, logger)
    }
}
