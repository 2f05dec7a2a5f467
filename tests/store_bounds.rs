//! Store Bound Tests
//!
//! Tests for the store's capacity guarantees:
//! - Distinct records never exceed the component cap
//! - Eviction removes the least recently updated record
//! - Per-record history is circular and ordered
//! - Getters return copies

use std::rc::Rc;

use rendercause::bridge::RootId;
use rendercause::clock::ManualClock;
use rendercause::config::{DebugVerbosity, MAX_TRACKED_COMPONENTS};
use rendercause::host::{MemoryHost, NodeSpec, NodeUpdate};
use rendercause::observability::Logger;
use rendercause::store::{IdentifyingAttributes, RenderUpdate};
use rendercause::{
    CauseVerdict, ContextBuilder, NativeCause, NodeTag, RenderTrackingStore, Settings, SettingsPatch,
};

fn update(tag: u64, at: i64) -> RenderUpdate {
    RenderUpdate {
        tag: NodeTag(tag),
        view_type: "RCTView".to_string(),
        display_name: None,
        attributes: IdentifyingAttributes::default(),
        owner_name: None,
        geometry: None,
        color: "#4FC3F7".to_string(),
        cause: CauseVerdict::new(NativeCause::Mount, at),
        inputs: None,
        state: None,
    }
}

fn store() -> RenderTrackingStore {
    RenderTrackingStore::new(Settings::default(), Logger::new(DebugVerbosity::Off))
}

// =============================================================================
// Component Cap
// =============================================================================

/// N + 1 distinct tags with cap N: size stays N, the oldest is evicted.
#[test]
fn test_cap_plus_one_evicts_oldest() {
    let mut store = store();
    let cap = MAX_TRACKED_COMPONENTS as u64;
    for tag in 0..=cap {
        store.track_render(update(tag, tag as i64));
        assert!(store.len() <= MAX_TRACKED_COMPONENTS);
    }
    assert_eq!(store.len(), MAX_TRACKED_COMPONENTS);
    assert!(store.get(NodeTag(0)).is_none());
    assert!(store.get(NodeTag(cap)).is_some());
}

/// Equal timestamps fall back to write order.
#[test]
fn test_eviction_ties_use_write_order() {
    let mut store = store();
    for tag in 0..=MAX_TRACKED_COMPONENTS as u64 {
        store.track_render(update(tag, 0));
    }
    assert!(store.get(NodeTag(0)).is_none());
    assert!(store.get(NodeTag(1)).is_some());
}

/// The cap holds through the full pipeline with a moving clock.
#[tokio::test]
async fn test_cap_through_pipeline() {
    let host = MemoryHost::new();
    let clock = ManualClock::new(0);
    let mut ctx = ContextBuilder::new()
        .clock(Rc::new(clock.clone()))
        .build(host.clone());
    ctx.init();

    for chunk in 0..5u64 {
        let nodes = (0..50)
            .map(|i| host.mount(NodeSpec::view(chunk * 50 + i + 1, "RCTView")))
            .collect();
        host.commit(RootId(0), nodes);
        ctx.process_pending().await;
        clock.advance(16);
    }

    assert_eq!(ctx.store().len(), MAX_TRACKED_COMPONENTS);
    // The first chunk was written earliest and is gone
    assert!(ctx.get(NodeTag(1)).is_none());
    assert!(ctx.get(NodeTag(50)).is_none());
    assert!(ctx.get(NodeTag(51)).is_some());
    assert!(ctx.get(NodeTag(250)).is_some());
}

// =============================================================================
// History
// =============================================================================

/// M > cap events: exactly cap retained, most recent, in original order.
#[test]
fn test_history_keeps_most_recent_in_order() {
    let mut store = store();
    store.set_settings(&SettingsPatch::history_depth(7));
    for at in 0..20 {
        store.track_render(update(1, at));
    }
    let history = store.get(NodeTag(1)).unwrap().history.unwrap();
    assert_eq!(history.len(), 7);
    let timestamps: Vec<i64> = history.iter().map(|e| e.timestamp).collect();
    assert_eq!(timestamps, (13..20).collect::<Vec<_>>());
    let numbers: Vec<u64> = history.iter().map(|e| e.render_number).collect();
    assert_eq!(numbers, (14..=20).collect::<Vec<_>>());
}

/// History depth is clamped to its range.
#[test]
fn test_history_depth_is_clamped() {
    let mut store = store();
    assert_eq!(store.set_settings(&SettingsPatch::history_depth(500)).history_depth, 50);
    assert_eq!(store.set_settings(&SettingsPatch::history_depth(1)).history_depth, 5);
    for at in 0..9 {
        store.track_render(update(1, at));
    }
    assert_eq!(store.get(NodeTag(1)).unwrap().history.unwrap().len(), 5);
}

/// Pipeline history records each cycle's verdict.
#[tokio::test]
async fn test_history_through_pipeline() {
    let host = MemoryHost::new();
    host.mount(NodeSpec::view(3, "RCTView").props(serde_json::json!({"n": 0})));
    let mut ctx = ContextBuilder::new()
        .clock(Rc::new(ManualClock::new(0)))
        .build(host.clone());
    ctx.init();

    for n in 0..12 {
        if n > 0 {
            host.update(NodeTag(3), NodeUpdate::new().props(serde_json::json!({"n": n})));
        }
        host.commit(RootId(0), vec![host.current(NodeTag(3)).unwrap()]);
        ctx.process_pending().await;
    }

    let record = ctx.get(NodeTag(3)).unwrap();
    assert_eq!(record.render_count, 12);
    let history = record.history.unwrap();
    assert_eq!(history.len(), Settings::default().history_depth);
    assert!(history.iter().all(|e| e.cause.native_cause == NativeCause::InputChange));
}

// =============================================================================
// Copies
// =============================================================================

/// Mutating a returned record does not touch the store.
#[test]
fn test_getters_return_copies() {
    let mut store = store();
    store.track_render(update(1, 0));
    let mut copy = store.get(NodeTag(1)).unwrap();
    copy.render_count = 99;
    copy.history = None;

    let record = store.get(NodeTag(1)).unwrap();
    assert_eq!(record.render_count, 1);
    assert!(record.history.is_some());
    assert_eq!(store.records()[0].render_count, 1);
}
