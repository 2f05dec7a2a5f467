//! Render tracking store
//!
//! Arena of records keyed by stable tag, with explicit eviction:
//! - at most `MAX_TRACKED_COMPONENTS` records; least recently updated goes first
//! - per-record history capped by `Settings::history_depth`, oldest first
//!
//! Getters hand out clones. Listeners receive the current state on
//! subscribe, then every change; in batch mode record notifications collapse
//! into one per batch.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::errors::ListenerResult;
use super::query::{matches_search, CompiledFilters};
use super::record::{RenderEvent, RenderUpdate, TrackedComponentRecord};
use crate::attribution::NativeCause;
use crate::config::{FilterConfig, FilterField, Settings, SettingsPatch, MAX_TRACKED_COMPONENTS};
use crate::host::NodeTag;
use crate::observability::{Event, Logger};

/// Boxed store listener
pub type Listener<T> = Box<dyn FnMut(&T) -> ListenerResult>;

/// Global tracking flags, as seen by state subscribers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingState {
    pub enabled: bool,
    pub paused: bool,
}

/// Which listener set a subscription belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    Records,
    State,
    Settings,
}

/// Handle returned by the `subscribe*` calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub kind: SubscriptionKind,
    pub id: u64,
}

/// Most rendered record, for stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MostRendered {
    pub tag: NodeTag,
    pub display_name: String,
    pub render_count: u64,
}

/// Aggregate view over every tracked record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub tracked_components: usize,
    pub total_renders: u64,
    /// Last native cause of each record
    pub by_native_cause: BTreeMap<NativeCause, usize>,
    pub most_rendered: Option<MostRendered>,
}

struct ListenerSet<T> {
    entries: Vec<(u64, Listener<T>)>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> ListenerSet<T> {
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Notify one listener, logging (not propagating) its error
    fn call(id: u64, listener: &mut Listener<T>, value: &T, kind: &str, logger: &Logger) {
        if let Err(err) = listener(value) {
            logger.error(
                Event::ListenerFailed,
                &[("kind", kind), ("listener", &id.to_string()), ("error", &err.to_string())],
            );
        }
    }

    fn notify(&mut self, value: &T, kind: &str, logger: &Logger) {
        for (id, listener) in self.entries.iter_mut() {
            Self::call(*id, listener, value, kind, logger);
        }
    }
}

/// The entity store
pub struct RenderTrackingStore {
    records: HashMap<NodeTag, TrackedComponentRecord>,
    settings: Settings,
    state: TrackingState,
    seq: u64,
    batch_depth: u32,
    dirty: bool,
    next_subscription: u64,
    record_listeners: ListenerSet<Vec<TrackedComponentRecord>>,
    state_listeners: ListenerSet<TrackingState>,
    settings_listeners: ListenerSet<Settings>,
    logger: Logger,
}

impl RenderTrackingStore {
    /// Empty store; tracking starts disabled and unpaused
    ///
    /// Out-of-range settings are clamped like any later update.
    pub fn new(mut settings: Settings, logger: Logger) -> Self {
        settings.clamp();
        logger.set_verbosity(settings.debug_verbosity);
        Self {
            records: HashMap::new(),
            settings,
            state: TrackingState::default(),
            seq: 0,
            batch_depth: 0,
            dirty: false,
            next_subscription: 0,
            record_listeners: ListenerSet::default(),
            state_listeners: ListenerSet::default(),
            settings_listeners: ListenerSet::default(),
            logger,
        }
    }

    // ==================
    // Writes
    // ==================

    /// Record one render
    ///
    /// Creates the record on first sight of the tag, otherwise mutates it
    /// in place. Appends a history event when history is on.
    pub fn track_render(&mut self, update: RenderUpdate) {
        self.seq += 1;
        let seq = self.seq;
        let settings = &self.settings;
        let is_new = !self.records.contains_key(&update.tag);

        let record = self
            .records
            .entry(update.tag)
            .or_insert_with(|| TrackedComponentRecord::new(&update, seq));

        if settings.count_renders {
            record.render_count += 1;
        }
        record.view_type = update.view_type;
        if let Some(name) = update.display_name {
            record.display_name = name;
        }
        record.test_id = update.attributes.test_id;
        record.accessibility_label = update.attributes.accessibility_label;
        record.owner_name = update.owner_name;
        record.last_seen = update.cause.timestamp;
        record.update_seq = seq;
        if update.geometry.is_some() {
            record.geometry = update.geometry;
        }
        record.color = update.color;

        if settings.keep_history {
            let mut event = RenderEvent::new(update.cause.clone(), record.render_count);
            if settings.capture_inputs {
                event.captured_inputs = update.inputs;
            }
            if settings.capture_state {
                event.captured_state = update.state;
            }
            record.history.get_or_insert_with(Default::default).push_back(event);
            record.truncate_history(settings.history_depth);
        } else {
            record.history = None;
        }
        record.last_cause = Some(update.cause);

        if is_new {
            self.evict_over_cap();
        }
        self.records_changed();
    }

    fn evict_over_cap(&mut self) {
        while self.records.len() > MAX_TRACKED_COMPONENTS {
            let oldest = self
                .records
                .values()
                .min_by_key(|record| record.recency())
                .map(|record| record.tag);
            let Some(tag) = oldest else {
                break;
            };
            self.records.remove(&tag);
            self.logger.trace(Event::RecordEvicted, &[("tag", &tag.to_string())]);
        }
    }

    /// Enter batch mode; record notifications are held until `end_batch`
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Leave batch mode, flushing one aggregated notification if anything changed
    pub fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 && self.dirty {
            self.dirty = false;
            self.notify_records();
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    fn records_changed(&mut self) {
        if self.batch_depth > 0 {
            self.dirty = true;
        } else {
            self.notify_records();
        }
    }

    fn notify_records(&mut self) {
        if self.record_listeners.is_empty() {
            return;
        }
        let snapshot = self.sorted();
        self.record_listeners.notify(&snapshot, "records", &self.logger);
    }

    /// Remove every record
    pub fn clear(&mut self) {
        self.records.clear();
        self.logger.info(Event::StoreCleared, &[]);
        self.records_changed();
    }

    /// Apply a partial settings update
    ///
    /// Turning history off drops existing histories; a smaller depth
    /// truncates them. Returns the resulting settings.
    pub fn set_settings(&mut self, patch: &SettingsPatch) -> Settings {
        self.settings.apply(patch);
        self.logger.set_verbosity(self.settings.debug_verbosity);

        let keep = self.settings.keep_history;
        let depth = self.settings.history_depth;
        for record in self.records.values_mut() {
            if keep {
                record.truncate_history(depth);
            } else {
                record.history = None;
            }
        }

        self.logger.info(
            Event::SettingsUpdated,
            &[
                ("batch_size", &self.settings.batch_size.to_string()),
                ("history_depth", &depth.to_string()),
                ("verbosity", self.settings.debug_verbosity.as_str()),
            ],
        );
        let settings = self.settings.clone();
        self.settings_listeners.notify(&settings, "settings", &self.logger);
        self.records_changed();
        settings
    }

    /// Update the global tracking flags
    pub fn set_tracking_state(&mut self, state: TrackingState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.state_listeners.notify(&state, "state", &self.logger);
    }

    // ==================
    // Reads
    // ==================

    pub fn settings(&self) -> Settings {
        self.settings.clone()
    }

    /// Borrow settings without cloning
    pub fn settings_ref(&self) -> &Settings {
        &self.settings
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of one record
    pub fn get(&self, tag: NodeTag) -> Option<TrackedComponentRecord> {
        self.records.get(&tag).cloned()
    }

    /// Current render count of a tag (0 when untracked)
    pub fn render_count(&self, tag: NodeTag) -> u64 {
        self.records.get(&tag).map(|r| r.render_count).unwrap_or(0)
    }

    fn sorted(&self) -> Vec<TrackedComponentRecord> {
        let mut records: Vec<TrackedComponentRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| b.recency().cmp(&a.recency()));
        records
    }

    /// Every record, most recently updated first
    pub fn records(&self) -> Vec<TrackedComponentRecord> {
        self.sorted()
    }

    /// Search, then include patterns, then exclude patterns; most recent first
    pub fn get_filtered(&self, search: &str, filters: &FilterConfig) -> Vec<TrackedComponentRecord> {
        let compiled = CompiledFilters::new(filters);
        let mut records: Vec<TrackedComponentRecord> = self
            .records
            .values()
            .filter(|record| matches_search(record, search) && compiled.is_visible(record))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recency().cmp(&a.recency()));
        records
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            tracked_components: self.records.len(),
            ..StoreStats::default()
        };
        for record in self.records.values() {
            stats.total_renders += record.render_count;
            if let Some(cause) = &record.last_cause {
                *stats.by_native_cause.entry(cause.native_cause).or_insert(0) += 1;
            }
        }
        stats.most_rendered = self
            .records
            .values()
            .max_by_key(|record| (record.render_count, record.recency()))
            .map(|record| MostRendered {
                tag: record.tag,
                display_name: record.display_name.clone(),
                render_count: record.render_count,
            });
        stats
    }

    /// Distinct observed values per identifying field, for filter pickers
    pub fn available_props(&self) -> BTreeMap<FilterField, BTreeSet<String>> {
        let mut props: BTreeMap<FilterField, BTreeSet<String>> = FilterField::CONCRETE
            .iter()
            .map(|field| (*field, BTreeSet::new()))
            .collect();
        for record in self.records.values() {
            for field in FilterField::CONCRETE {
                let values = super::query::field_values(record, field);
                if let Some(set) = props.get_mut(&field) {
                    set.extend(values.into_iter().map(str::to_string));
                }
            }
        }
        props
    }

    // ==================
    // Subscriptions
    // ==================

    fn next_id(&mut self) -> u64 {
        self.next_subscription += 1;
        self.next_subscription
    }

    /// Receive the record list now and on every change
    pub fn subscribe(&mut self, mut listener: Listener<Vec<TrackedComponentRecord>>) -> Subscription {
        let id = self.next_id();
        let snapshot = self.sorted();
        ListenerSet::call(id, &mut listener, &snapshot, "records", &self.logger);
        self.record_listeners.entries.push((id, listener));
        Subscription {
            kind: SubscriptionKind::Records,
            id,
        }
    }

    /// Receive the tracking flags now and on every change
    pub fn subscribe_to_state(&mut self, mut listener: Listener<TrackingState>) -> Subscription {
        let id = self.next_id();
        ListenerSet::call(id, &mut listener, &self.state, "state", &self.logger);
        self.state_listeners.entries.push((id, listener));
        Subscription {
            kind: SubscriptionKind::State,
            id,
        }
    }

    /// Receive the settings now and on every change
    pub fn subscribe_to_settings(&mut self, mut listener: Listener<Settings>) -> Subscription {
        let id = self.next_id();
        ListenerSet::call(id, &mut listener, &self.settings, "settings", &self.logger);
        self.settings_listeners.entries.push((id, listener));
        Subscription {
            kind: SubscriptionKind::Settings,
            id,
        }
    }

    /// Remove a listener; false when it was not registered
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        match subscription.kind {
            SubscriptionKind::Records => self.record_listeners.remove(subscription.id),
            SubscriptionKind::State => self.state_listeners.remove(subscription.id),
            SubscriptionKind::Settings => self.settings_listeners.remove(subscription.id),
        }
    }
}
