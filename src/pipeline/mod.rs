//! Batch processing pipeline
//!
//! One notification cycle runs through a fixed sequence of phases:
//!
//! 1. Filter: drop duplicate tags and the overlay's own nodes, assign colors
//! 2. Measure: request geometry for up to `batch_size` nodes and join
//! 3. Track: attribute causes and write every node to the store in one batch
//! 4. Deliver: hand highlights to the overlay callback
//!
//! Cycles never overlap: `run_cycle` takes `&mut self` and is awaited to
//! completion before the next batch is pulled from the bridge.

mod errors;
mod geometry;
mod palette;
mod phases;
mod self_filter;

use std::rc::Rc;

pub use errors::{CallbackError, CallbackResult, MeasureError, MeasureResult};
pub use geometry::{Geometry, GeometryProvider, RawGeometry};
pub use palette::{Palette, DEFAULT_HIGHLIGHT_COLOR, HEAT_COLORS};
pub use phases::{Delivered, Filtered, Highlight, HighlightCallback, Measured, Received, Tracked};
pub use self_filter::{
    SelfExclusionFilter, EXCLUSION_CACHE_CAPACITY, MAX_EXCLUSION_DEPTH, OVERLAY_ID_PREFIXES,
    OVERLAY_NAMES,
};

use crate::attribution::AttributionEngine;
use crate::clock::{Clock, SystemClock};
use crate::host::HostAdapter;
use crate::observability::{BenchmarkSink, CycleMetrics, Event, Logger, NullSink};
use crate::store::RenderTrackingStore;

/// Drives cycles from received nodes to delivered highlights
pub struct BatchPipeline {
    engine: AttributionEngine,
    self_filter: SelfExclusionFilter,
    palette: Palette,
    sink: Box<dyn BenchmarkSink>,
    callback: Option<HighlightCallback>,
    clock: Rc<dyn Clock>,
    cycle: u64,
    logger: Logger,
}

impl BatchPipeline {
    pub fn new(logger: Logger) -> Self {
        Self {
            engine: AttributionEngine::new(logger.clone()),
            self_filter: SelfExclusionFilter::new(),
            palette: Palette::default(),
            sink: Box::new(NullSink),
            callback: None,
            clock: Rc::new(SystemClock),
            cycle: 0,
            logger,
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn BenchmarkSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_self_filter(mut self, self_filter: SelfExclusionFilter) -> Self {
        self.self_filter = self_filter;
        self
    }

    pub fn set_highlight_callback(&mut self, callback: HighlightCallback) {
        self.callback = Some(callback);
    }

    pub fn clear_highlight_callback(&mut self) {
        self.callback = None;
    }

    /// Cycles started so far
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn engine(&self) -> &AttributionEngine {
        &self.engine
    }

    /// Forget every snapshot and cached exclusion
    pub fn clear(&mut self) {
        self.engine.clear();
        self.self_filter.clear();
    }

    /// Run one cycle
    ///
    /// Returns `None` when the cycle was skipped before any work: tracking
    /// disabled or paused, or no nodes received.
    pub async fn run_cycle<A, G>(
        &mut self,
        adapter: &A,
        geometry: &G,
        store: &mut RenderTrackingStore,
        nodes: Vec<A::Node>,
    ) -> Option<CycleMetrics>
    where
        A: HostAdapter,
        G: GeometryProvider<A::Node>,
    {
        let state = store.tracking_state();
        if !state.enabled || state.paused || nodes.is_empty() {
            let reason = if !state.enabled {
                "disabled"
            } else if state.paused {
                "paused"
            } else {
                "empty"
            };
            self.logger.trace(Event::CycleSkipped, &[("reason", reason)]);
            return None;
        }

        // Settings are read once; a change mid-cycle applies to the next one
        let settings = store.settings();
        let timestamp = self.clock.now_ms();
        self.cycle += 1;
        self.logger.debug(
            Event::CycleReceived,
            &[
                ("cycle", &self.cycle.to_string()),
                ("nodes", &nodes.len().to_string()),
            ],
        );

        let filtered = Received::new(self.cycle, nodes).filter(
            adapter,
            &mut self.self_filter,
            store,
            &self.palette,
            &settings,
        );
        if filtered.is_empty() {
            return Some(filtered.finish_empty(self.sink.as_mut(), &self.logger));
        }
        self.logger.trace(Event::CycleFiltered, &[("cycle", &self.cycle.to_string())]);

        let measured = filtered
            .measure(geometry, settings.batch_size, &self.logger)
            .await;
        let tracked = measured.track(
            adapter,
            &mut self.engine,
            store,
            &settings,
            timestamp,
            &self.logger,
        );
        let delivered = tracked.deliver(self.callback.as_mut(), &self.logger);
        Some(delivered.finish(self.sink.as_mut(), &self.logger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{DebugVerbosity, Settings, SettingsPatch};
    use crate::host::{MemoryHost, MemoryNode, NodeSpec, NodeTag, NodeUpdate};
    use crate::observability::{CycleOutcome, MemoryBenchmarkSink};
    use crate::store::TrackingState;
    use std::cell::RefCell;

    fn store() -> RenderTrackingStore {
        let mut store = RenderTrackingStore::new(Settings::default(), Logger::default());
        store.set_tracking_state(TrackingState {
            enabled: true,
            paused: false,
        });
        store
    }

    fn pipeline() -> (BatchPipeline, MemoryBenchmarkSink) {
        let sink = MemoryBenchmarkSink::new();
        let pipeline = BatchPipeline::new(Logger::default())
            .with_clock(Rc::new(ManualClock::new(1_000)))
            .with_sink(Box::new(sink.clone()));
        (pipeline, sink)
    }

    fn mount_views(host: &MemoryHost, count: u64) -> Vec<MemoryNode> {
        (1..=count)
            .map(|tag| host.mount(NodeSpec::view(tag, "RCTView")))
            .collect()
    }

    #[tokio::test]
    async fn test_skipped_while_disabled_or_paused() {
        let host = MemoryHost::new();
        let nodes = mount_views(&host, 3);
        let (mut pipeline, sink) = pipeline();
        let mut store = RenderTrackingStore::new(Settings::default(), Logger::default());

        assert!(pipeline.run_cycle(&host, &host, &mut store, nodes.clone()).await.is_none());

        store.set_tracking_state(TrackingState {
            enabled: true,
            paused: true,
        });
        assert!(pipeline.run_cycle(&host, &host, &mut store, nodes).await.is_none());
        assert!(pipeline.run_cycle(&host, &host, &mut store, Vec::new()).await.is_none());
        assert!(sink.records().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_batch_size_caps_measurement() {
        let host = MemoryHost::new();
        let nodes = mount_views(&host, 250);
        let (mut pipeline, sink) = pipeline();
        let mut store = store();

        let metrics = pipeline.run_cycle(&host, &host, &mut store, nodes).await.unwrap();
        assert_eq!(metrics.nodes_received, 250);
        assert_eq!(metrics.nodes_filtered, 250);
        assert_eq!(metrics.nodes_in_batch, 150);
        assert_eq!(metrics.nodes_tracked, 150);
        assert_eq!(store.len(), 150);
        assert!(store.get(NodeTag(151)).is_none());
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_and_overlay_nodes_are_dropped() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(100, "RenderCauseOverlay"));
        let rect = host.mount(NodeSpec::view(101, "RCTView").child_of(100));
        let app = host.mount(NodeSpec::view(1, "RCTView"));
        let (mut pipeline, _) = pipeline();
        let mut store = store();

        let metrics = pipeline
            .run_cycle(&host, &host, &mut store, vec![app, app, rect])
            .await
            .unwrap();
        assert_eq!(metrics.nodes_duplicate, 1);
        assert_eq!(metrics.nodes_excluded, 1);
        assert_eq!(metrics.nodes_tracked, 1);
        assert!(store.get(NodeTag(101)).is_none());

        let metrics = pipeline.run_cycle(&host, &host, &mut store, vec![rect]).await.unwrap();
        assert_eq!(metrics.outcome, CycleOutcome::EmptyAfterFilter);
        assert_eq!(metrics.nodes_tracked, 0);
    }

    #[tokio::test]
    async fn test_measure_failure_drops_node() {
        let host = MemoryHost::new();
        let nodes = mount_views(&host, 3);
        host.fail_measurement(NodeTag(2));
        let (mut pipeline, _) = pipeline();
        let mut store = store();

        let metrics = pipeline.run_cycle(&host, &host, &mut store, nodes).await.unwrap();
        assert_eq!(metrics.measure_failures, 1);
        assert_eq!(metrics.nodes_measured, 2);
        assert!(store.get(NodeTag(2)).is_none());
        assert_eq!(metrics.outcome, CycleOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_nothing_to_draw() {
        let host = MemoryHost::new();
        let nodes = mount_views(&host, 2);
        host.set_geometry(NodeTag(1), RawGeometry::complete(0.0, 0.0, 0.0, 0.0));
        host.fail_measurement(NodeTag(2));
        let (mut pipeline, _) = pipeline();
        let mut store = store();

        let metrics = pipeline.run_cycle(&host, &host, &mut store, nodes).await.unwrap();
        assert_eq!(metrics.outcome, CycleOutcome::NothingToDraw);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_counts_drive_colors() {
        let host = MemoryHost::new();
        let node = host.mount(NodeSpec::view(1, "RCTView"));
        let (mut pipeline, _) = pipeline();
        let mut store = store();
        let seen: Rc<RefCell<Vec<Highlight>>> = Rc::default();
        let sink = seen.clone();
        pipeline.set_highlight_callback(Box::new(move |highlights| {
            sink.borrow_mut().extend_from_slice(highlights);
            Ok(())
        }));

        pipeline.run_cycle(&host, &host, &mut store, vec![node]).await;
        let node = host.update(NodeTag(1), NodeUpdate::new()).unwrap();
        pipeline.run_cycle(&host, &host, &mut store, vec![node]).await;

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!((seen[0].count, seen[0].color.as_str()), (1, HEAT_COLORS[0]));
        assert_eq!((seen[1].count, seen[1].color.as_str()), (2, HEAT_COLORS[1]));
        assert_eq!(store.render_count(NodeTag(1)), 2);
    }

    #[tokio::test]
    async fn test_uncounted_renders_use_default_color() {
        let host = MemoryHost::new();
        let nodes = mount_views(&host, 1);
        let (mut pipeline, _) = pipeline();
        let mut store = store();
        store.set_settings(&SettingsPatch {
            count_renders: Some(false),
            ..SettingsPatch::default()
        });
        let seen: Rc<RefCell<Vec<Highlight>>> = Rc::default();
        let sink = seen.clone();
        pipeline.set_highlight_callback(Box::new(move |highlights| {
            sink.borrow_mut().extend_from_slice(highlights);
            Ok(())
        }));

        pipeline.run_cycle(&host, &host, &mut store, nodes).await;
        assert_eq!(seen.borrow()[0].color, DEFAULT_HIGHLIGHT_COLOR);
        assert_eq!(seen.borrow()[0].count, 0);
    }

    #[tokio::test]
    async fn test_callback_failure_is_recorded() {
        let host = MemoryHost::new();
        let nodes = mount_views(&host, 2);
        let (logger, capture) = Logger::capturing(DebugVerbosity::Minimal);
        let mut pipeline = BatchPipeline::new(logger);
        let mut store = store();
        pipeline.set_highlight_callback(Box::new(|_| Err(CallbackError::failed("overlay gone"))));

        let metrics = pipeline.run_cycle(&host, &host, &mut store, nodes).await.unwrap();
        assert_eq!(metrics.outcome, CycleOutcome::CallbackFailed);
        assert_eq!(metrics.highlights_delivered, 0);
        // The store write is not rolled back
        assert_eq!(store.len(), 2);
        assert_eq!(capture.events(Event::HighlightCallbackFailed).len(), 1);
    }

    #[tokio::test]
    async fn test_timestamps_come_from_the_clock() {
        let host = MemoryHost::new();
        let nodes = mount_views(&host, 1);
        let clock = ManualClock::new(5_000);
        let mut pipeline = BatchPipeline::new(Logger::default()).with_clock(Rc::new(clock.clone()));
        let mut store = store();

        pipeline.run_cycle(&host, &host, &mut store, nodes).await;
        let record = store.get(NodeTag(1)).unwrap();
        assert_eq!(record.first_seen, 5_000);
        assert_eq!(record.last_cause.unwrap().timestamp, 5_000);
        assert_eq!(pipeline.cycles(), 1);
    }
}
