//! Bridge errors

use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The bridge is not subscribed to the host
    #[error("Bridge is not attached")]
    Detached,

    /// The host dropped every sender for the subscription
    #[error("Host closed the commit channel")]
    ChannelClosed,
}
