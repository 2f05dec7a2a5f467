//! Explicit render-cause instance
//!
//! A `RenderCauseContext` owns everything one tracking session needs: the
//! bridge to the host's commit hook, the pipeline with its cross-cycle
//! caches, the store and the active filters. Instances are independent, so
//! two contexts over two hosts never share state.
//!
//! ```ignore
//! let mut ctx = ContextBuilder::new().settings(settings).build(host);
//! ctx.init();
//! ctx.set_highlight_callback(Box::new(|highlights| overlay.draw(highlights)));
//! ctx.process_pending().await;
//! ctx.dispose();
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::bridge::{BridgeError, BridgeResult, IntrospectionHook, RootId, TreeBridge};
use crate::clock::{Clock, SystemClock};
use crate::config::{FilterConfig, FilterField, Settings, SettingsPatch};
use crate::host::{HostAdapter, NodeTag};
use crate::observability::{BenchmarkSink, CycleMetrics, Event, Logger, NullSink};
use crate::pipeline::{
    BatchPipeline, GeometryProvider, HighlightCallback, Palette, SelfExclusionFilter,
};
use crate::store::{
    Listener, RenderTrackingStore, StoreStats, Subscription, TrackedComponentRecord, TrackingState,
};

/// Builder for `RenderCauseContext`
pub struct ContextBuilder {
    settings: Settings,
    filters: FilterConfig,
    logger: Logger,
    clock: Rc<dyn Clock>,
    sink: Box<dyn BenchmarkSink>,
    palette: Palette,
    self_filter: SelfExclusionFilter,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            filters: FilterConfig::default(),
            logger: Logger::default(),
            clock: Rc::new(SystemClock),
            sink: Box::new(NullSink),
            palette: Palette::default(),
            self_filter: SelfExclusionFilter::new(),
        }
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn filters(mut self, filters: FilterConfig) -> Self {
        self.filters = filters;
        self
    }

    /// Logger shared by every subsystem; its verbosity follows the settings
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn benchmark_sink(mut self, sink: Box<dyn BenchmarkSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn self_filter(mut self, self_filter: SelfExclusionFilter) -> Self {
        self.self_filter = self_filter;
        self
    }

    /// Build a context over `host`; nothing is subscribed until `init`
    pub fn build<H>(self, host: H) -> RenderCauseContext<H>
    where
        H: HostAdapter + IntrospectionHook<<H as HostAdapter>::Node> + GeometryProvider<<H as HostAdapter>::Node>,
    {
        let store = RenderTrackingStore::new(self.settings, self.logger.clone());
        let pipeline = BatchPipeline::new(self.logger.clone())
            .with_clock(self.clock)
            .with_sink(self.sink)
            .with_palette(self.palette)
            .with_self_filter(self.self_filter);
        RenderCauseContext {
            bridge: TreeBridge::new(host, self.logger.clone()),
            pipeline,
            store,
            filters: self.filters,
            initialized: false,
            logger: self.logger,
        }
    }
}

/// One tracking session over one host
pub struct RenderCauseContext<H: HostAdapter> {
    bridge: TreeBridge<H::Node, H>,
    pipeline: BatchPipeline,
    store: RenderTrackingStore,
    filters: FilterConfig,
    initialized: bool,
    logger: Logger,
}

impl<H> RenderCauseContext<H>
where
    H: HostAdapter + IntrospectionHook<<H as HostAdapter>::Node> + GeometryProvider<<H as HostAdapter>::Node>,
{
    // ==================
    // Lifecycle
    // ==================

    /// Subscribe to the host and start tracking
    ///
    /// Returns false if already initialized.
    pub fn init(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        self.set_enabled(true);
        self.logger.info(
            Event::ContextInit,
            &[("roots", &self.bridge.enabled_roots().len().to_string())],
        );
        true
    }

    /// Stop tracking, unsubscribe and drop every cross-cycle cache
    ///
    /// Returns false if not initialized.
    pub fn dispose(&mut self) -> bool {
        if !self.initialized {
            return false;
        }
        self.set_enabled(false);
        self.pipeline.clear();
        self.pipeline.clear_highlight_callback();
        self.initialized = false;
        self.logger.info(Event::ContextDispose, &[]);
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Turn tracking and the host's notifications on or off
    ///
    /// Affects only cycles that have not started yet.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.bridge.attach();
        } else {
            self.bridge.detach();
        }
        let state = TrackingState {
            enabled,
            ..self.store.tracking_state()
        };
        self.store.set_tracking_state(state);
        self.logger
            .info(Event::TrackingToggled, &[("enabled", &enabled.to_string())]);
    }

    /// Abort every following cycle before it touches the store
    pub fn pause(&mut self) {
        self.set_paused(true);
    }

    pub fn resume(&mut self) {
        self.set_paused(false);
    }

    fn set_paused(&mut self, paused: bool) {
        let state = TrackingState {
            paused,
            ..self.store.tracking_state()
        };
        self.store.set_tracking_state(state);
        self.logger
            .info(Event::PauseToggled, &[("paused", &paused.to_string())]);
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.store.tracking_state()
    }

    // ==================
    // Host and overlay
    // ==================

    pub fn host(&self) -> &H {
        self.bridge.hook()
    }

    /// Enable notifications on roots the host mounted since `init`
    pub fn sync_roots(&mut self) {
        self.bridge.sync_roots();
    }

    pub fn enable_root(&mut self, root: RootId) {
        self.bridge.enable_root(root);
    }

    pub fn disable_root(&mut self, root: RootId) {
        self.bridge.disable_root(root);
    }

    pub fn set_highlight_callback(&mut self, callback: HighlightCallback) {
        self.pipeline.set_highlight_callback(callback);
    }

    pub fn clear_highlight_callback(&mut self) {
        self.pipeline.clear_highlight_callback();
    }

    // ==================
    // Processing
    // ==================

    /// Run one cycle per batch already queued by the host
    ///
    /// Returns the metrics of every cycle that ran; skipped cycles (paused,
    /// disabled) produce none. A detached bridge has nothing to drain.
    pub async fn process_pending(&mut self) -> Vec<CycleMetrics> {
        self.bridge.sync_roots();
        let mut finished = Vec::new();
        while let Ok(Some(batch)) = self.bridge.try_next_batch() {
            let metrics = self
                .pipeline
                .run_cycle(self.bridge.hook(), self.bridge.hook(), &mut self.store, batch.nodes)
                .await;
            finished.extend(metrics);
        }
        finished
    }

    /// Wait for the next batch and run it
    pub async fn process_next(&mut self) -> BridgeResult<Option<CycleMetrics>> {
        if !self.bridge.is_attached() {
            return Err(BridgeError::Detached);
        }
        let batch = self.bridge.next_batch().await?;
        Ok(self
            .pipeline
            .run_cycle(self.bridge.hook(), self.bridge.hook(), &mut self.store, batch.nodes)
            .await)
    }

    /// Cycles run since the context was built
    pub fn cycles(&self) -> u64 {
        self.pipeline.cycles()
    }

    // ==================
    // Settings and filters
    // ==================

    pub fn settings(&self) -> Settings {
        self.store.settings()
    }

    pub fn set_settings(&mut self, patch: &SettingsPatch) -> Settings {
        self.store.set_settings(patch)
    }

    pub fn filters(&self) -> FilterConfig {
        self.filters.clone()
    }

    pub fn set_filters(&mut self, filters: FilterConfig) {
        self.logger.debug(
            Event::FiltersUpdated,
            &[
                ("include", &filters.include.len().to_string()),
                ("exclude", &filters.exclude.len().to_string()),
            ],
        );
        self.filters = filters;
    }

    // ==================
    // Store
    // ==================

    /// Records matching `search` and the active filters, newest first
    pub fn get_filtered(&self, search: &str) -> Vec<TrackedComponentRecord> {
        self.store.get_filtered(search, &self.filters)
    }

    pub fn get(&self, tag: NodeTag) -> Option<TrackedComponentRecord> {
        self.store.get(tag)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn available_props(&self) -> BTreeMap<FilterField, BTreeSet<String>> {
        self.store.available_props()
    }

    /// Drop every tracked record; snapshots for attribution are kept
    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn subscribe(&mut self, listener: Listener<Vec<TrackedComponentRecord>>) -> Subscription {
        self.store.subscribe(listener)
    }

    pub fn subscribe_to_state(&mut self, listener: Listener<TrackingState>) -> Subscription {
        self.store.subscribe_to_state(listener)
    }

    pub fn subscribe_to_settings(&mut self, listener: Listener<Settings>) -> Subscription {
        self.store.subscribe_to_settings(listener)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.store.unsubscribe(subscription)
    }

    pub fn store(&self) -> &RenderTrackingStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::NativeCause;
    use crate::clock::ManualClock;
    use crate::host::{HostValue, MemoryHost, NodeSpec, NodeUpdate};
    use crate::pipeline::Highlight;
    use serde_json::json;
    use std::cell::RefCell;

    fn context() -> (MemoryHost, RenderCauseContext<MemoryHost>) {
        let host = MemoryHost::new();
        host.mount(NodeSpec::view(1, "RCTText").props(json!({"children": "a"})));
        let ctx = ContextBuilder::new()
            .clock(Rc::new(ManualClock::new(0)))
            .build(host.clone());
        (host, ctx)
    }

    #[tokio::test]
    async fn test_init_and_dispose() {
        let (host, mut ctx) = context();
        assert!(!ctx.tracking_state().enabled);
        assert!(ctx.init());
        assert!(!ctx.init());
        assert!(ctx.tracking_state().enabled);
        assert!(host.notifications_enabled(RootId(0)));

        assert!(ctx.dispose());
        assert!(!ctx.dispose());
        assert!(!ctx.tracking_state().enabled);
        assert!(!host.notifications_enabled(RootId(0)));
        assert_eq!(host.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_commits_flow_into_the_store() {
        let (host, mut ctx) = context();
        ctx.init();
        let drawn: Rc<RefCell<Vec<Highlight>>> = Rc::default();
        let sink = drawn.clone();
        ctx.set_highlight_callback(Box::new(move |highlights| {
            sink.borrow_mut().extend_from_slice(highlights);
            Ok(())
        }));

        let node = host.current(NodeTag(1)).unwrap();
        host.commit(RootId(0), vec![node]);
        let node = host
            .update(NodeTag(1), NodeUpdate::new().props(json!({"children": "b"})))
            .unwrap();
        host.commit(RootId(0), vec![node]);

        let cycles = ctx.process_pending().await;
        assert_eq!(cycles.len(), 2);
        assert_eq!(drawn.borrow().len(), 2);

        let record = ctx.get(NodeTag(1)).unwrap();
        assert_eq!(record.render_count, 2);
        let cause = record.last_cause.unwrap();
        assert_eq!(cause.native_cause, NativeCause::InputChange);
        assert_eq!(cause.changed_input_keys, Some(vec!["children".to_string()]));
    }

    #[tokio::test]
    async fn test_paused_cycles_do_not_touch_the_store() {
        let (host, mut ctx) = context();
        ctx.init();
        ctx.pause();
        let node = host.current(NodeTag(1)).unwrap();
        host.commit(RootId(0), vec![node]);
        assert!(ctx.process_pending().await.is_empty());
        assert!(ctx.store().is_empty());

        ctx.resume();
        host.commit(RootId(0), vec![node]);
        assert_eq!(ctx.process_pending().await.len(), 1);
        assert_eq!(ctx.store().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_context_receives_nothing() {
        let (host, mut ctx) = context();
        ctx.init();
        ctx.set_enabled(false);
        let node = host.current(NodeTag(1)).unwrap();
        assert_eq!(host.commit(RootId(0), vec![node]), 0);
        assert!(ctx.process_pending().await.is_empty());
        assert_eq!(
            ctx.process_next().await.unwrap_err(),
            BridgeError::Detached
        );
    }

    #[tokio::test]
    async fn test_filters_apply_to_queries() {
        let (host, mut ctx) = context();
        host.mount(NodeSpec::view(2, "RCTView").props(HostValue::object([("testID", HostValue::from("card"))])));
        ctx.init();
        let nodes = vec![host.current(NodeTag(1)).unwrap(), host.current(NodeTag(2)).unwrap()];
        host.commit(RootId(0), nodes);
        ctx.process_pending().await;
        assert_eq!(ctx.get_filtered("").len(), 2);

        ctx.set_filters(FilterConfig::new().include(FilterField::TestId, "card"));
        let visible = ctx.get_filtered("");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].tag, NodeTag(2));
        assert!(ctx.available_props()[&FilterField::TestId].contains("card"));
    }

    #[tokio::test]
    async fn test_contexts_are_independent() {
        let (host_a, mut a) = context();
        let (_host_b, mut b) = context();
        a.init();
        b.init();
        a.set_settings(&SettingsPatch::batch_size(10));

        host_a.commit(RootId(0), vec![host_a.current(NodeTag(1)).unwrap()]);
        a.process_pending().await;
        assert_eq!(a.store().len(), 1);
        assert!(b.process_pending().await.is_empty());
        assert!(b.store().is_empty());
        assert_eq!(b.settings().batch_size, Settings::default().batch_size);
        assert_eq!(a.settings().batch_size, 10);
    }

    #[tokio::test]
    async fn test_state_subscribers_see_lifecycle() {
        let (_host, mut ctx) = context();
        let seen: Rc<RefCell<Vec<TrackingState>>> = Rc::default();
        let sink = seen.clone();
        ctx.subscribe_to_state(Box::new(move |state| {
            sink.borrow_mut().push(*state);
            Ok(())
        }));
        ctx.init();
        ctx.pause();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(!seen[0].enabled);
        assert!(seen[1].enabled && !seen[1].paused);
        assert!(seen[2].paused);
    }
}
