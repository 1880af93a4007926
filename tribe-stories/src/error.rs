//! Error types for tribe-stories
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for tribe-stories
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Viewer opened or moved to a position outside the story groups
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Input sent to a viewer that has already closed
    #[error("Viewer closed")]
    ViewerClosed,

    /// A like request is already in flight
    #[error("Like already in flight for story {0}")]
    LikeInFlight(u64),

    /// Camera acquisition or recording failure
    #[error("Camera error: {0}")]
    Camera(String),

    /// Operation not valid in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Shared library errors
    #[error(transparent)]
    Common(#[from] tribe_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using tribe-stories Error
pub type Result<T> = std::result::Result<T, Error>;
