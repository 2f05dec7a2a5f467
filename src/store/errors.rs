//! # Store Errors
//!
//! Errors reported by store subscribers. A failing listener is logged and
//! skipped; the remaining listeners are still notified.

use thiserror::Error;

/// Result type returned by store listeners
pub type ListenerResult = Result<(), ListenerError>;

/// Listener errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListenerError {
    /// The listener could not process the notification
    #[error("Listener failed: {0}")]
    Failed(String),

    /// The listener's consumer has gone away
    #[error("Listener disconnected")]
    Disconnected,
}

impl ListenerError {
    pub fn failed(message: impl Into<String>) -> Self {
        ListenerError::Failed(message.into())
    }
}
