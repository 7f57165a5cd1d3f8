//! Error types for the host layer.

use std::time::Duration;

use canvas_core::CanvasError;
use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised while loading or persisting scenes.
///
/// These never reach a controller as a command response: persistence runs
/// after the command has already been answered.
#[derive(Debug, Error)]
pub enum HostError {
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored scene could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Loading a scene did not finish in time.
    #[error("Timed out loading scene {key} after {timeout:?}")]
    Timeout {
        /// Scene key being loaded.
        key: String,
        /// The limit that was exceeded.
        timeout: Duration,
    },
}

impl From<CanvasError> for HostError {
    fn from(err: CanvasError) -> Self {
        Self::Serialization(err.to_string())
    }
}
