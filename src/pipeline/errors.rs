//! # Pipeline Errors
//!
//! Nothing here is fatal. A measurement error drops one node from the
//! cycle's output; a callback error is logged and recorded in the cycle's
//! metrics.

use thiserror::Error;

/// Result type for geometry measurement
pub type MeasureResult<T> = Result<T, MeasureError>;

/// Result type returned by the highlight callback
pub type CallbackResult = Result<(), CallbackError>;

/// Geometry measurement errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MeasureError {
    /// The host could not lay out the node
    #[error("Geometry unavailable: {0}")]
    Unavailable(String),

    /// The node is no longer in the tree
    #[error("Node detached before measurement")]
    Detached,
}

/// Highlight callback errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallbackError {
    /// The overlay rejected the highlights
    #[error("Highlight callback failed: {0}")]
    Failed(String),
}

impl CallbackError {
    pub fn failed(message: impl Into<String>) -> Self {
        CallbackError::Failed(message.into())
    }
}
