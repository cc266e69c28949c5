//! Error types for the activity keeper.

use thiserror::Error;

/// Result type alias for restless operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while monitoring or synthesizing input.
#[derive(Debug, Error)]
pub enum Error {
    /// The monitor or listener is already running.
    #[error("already running")]
    AlreadyRunning,

    /// The monitor or listener is not running.
    #[error("not running")]
    NotRunning,

    /// Failed to start the input listener.
    #[error("failed to start listener: {0}")]
    ListenerStartFailed(String),

    /// Failed to inject a synthetic event.
    #[error("failed to inject event: {0}")]
    InjectFailed(String),

    /// Failed to query input state (e.g. the cursor position).
    #[error("failed to query input state: {0}")]
    QueryFailed(String),

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Platform-specific error.
    #[error("platform error: {0}")]
    Platform(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),

    /// The requested capability is not available on this platform.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other errors.
    #[error("{0}")]
    Other(String),
}
