//! Observable events for render-cause tracking
//!
//! Every log line names one of these events. Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Context initialized and bridge attached
    ContextInit,
    /// Context disposed and bridge detached
    ContextDispose,
    /// Tracking enabled or disabled
    TrackingToggled,
    /// Tracking paused or resumed
    PauseToggled,

    // Bridge
    /// Subscribed to the host's commit notifications
    BridgeAttached,
    /// Unsubscribed from the host's commit notifications
    BridgeDetached,
    /// Notifications toggled for one root
    RootNotifications,

    // Cycle phases
    /// A notification cycle arrived
    CycleReceived,
    /// A cycle was aborted before any work (disabled, paused, empty)
    CycleSkipped,
    /// Self-instrumentation nodes dropped
    CycleFiltered,
    /// A node's geometry could not be measured
    MeasureFailed,
    /// Attribution finished for one node
    NodeAttributed,
    /// A cycle's writes were flushed to the store
    CycleTracked,
    /// The highlight callback was invoked
    HighlightsDelivered,
    /// The highlight callback returned an error
    HighlightCallbackFailed,
    /// A cycle reached its final state
    CycleFinished,

    // Attribution internals
    /// The received buffer was stale and the pair was swapped
    BufferSwapped,
    /// No comparable value found; orientation unverified
    BufferUnverified,

    // Store
    /// A subscriber returned an error
    ListenerFailed,
    /// A record was evicted over the component cap
    RecordEvicted,
    /// The store was cleared
    StoreCleared,
    /// Settings changed
    SettingsUpdated,
    /// Filters changed
    FiltersUpdated,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lifecycle
            Event::ContextInit => "CONTEXT_INIT",
            Event::ContextDispose => "CONTEXT_DISPOSE",
            Event::TrackingToggled => "TRACKING_TOGGLED",
            Event::PauseToggled => "PAUSE_TOGGLED",

            // Bridge
            Event::BridgeAttached => "BRIDGE_ATTACHED",
            Event::BridgeDetached => "BRIDGE_DETACHED",
            Event::RootNotifications => "ROOT_NOTIFICATIONS",

            // Cycle
            Event::CycleReceived => "CYCLE_RECEIVED",
            Event::CycleSkipped => "CYCLE_SKIPPED",
            Event::CycleFiltered => "CYCLE_FILTERED",
            Event::MeasureFailed => "MEASURE_FAILED",
            Event::NodeAttributed => "NODE_ATTRIBUTED",
            Event::CycleTracked => "CYCLE_TRACKED",
            Event::HighlightsDelivered => "HIGHLIGHTS_DELIVERED",
            Event::HighlightCallbackFailed => "HIGHLIGHT_CALLBACK_FAILED",
            Event::CycleFinished => "CYCLE_FINISHED",

            // Attribution
            Event::BufferSwapped => "BUFFER_SWAPPED",
            Event::BufferUnverified => "BUFFER_UNVERIFIED",

            // Store
            Event::ListenerFailed => "LISTENER_FAILED",
            Event::RecordEvicted => "RECORD_EVICTED",
            Event::StoreCleared => "STORE_CLEARED",
            Event::SettingsUpdated => "SETTINGS_UPDATED",
            Event::FiltersUpdated => "FILTERS_UPDATED",
        }
    }

    /// Default severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ListenerFailed | Event::HighlightCallbackFailed => Severity::Error,
            Event::MeasureFailed => Severity::Debug,
            Event::NodeAttributed
            | Event::BufferSwapped
            | Event::BufferUnverified
            | Event::RecordEvicted => Severity::Trace,
            Event::CycleFiltered | Event::CycleTracked | Event::HighlightsDelivered => {
                Severity::Debug
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
