//! Configuration errors

use thiserror::Error;

/// Result type for configuration decoding
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while decoding persisted configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The persisted payload was not valid JSON for the expected shape
    #[error("Invalid {what} payload: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization failed
    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
