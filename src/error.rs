//! Error types for livetail-client.

use arrow_schema::ArrowError;
use thiserror::Error;

/// Main error type for all live-tail operations.
///
/// Every variant except [`LiveTailError::Json`] maps onto one of the session
/// failure kinds surfaced through `SessionStatus::Errored`.
#[derive(Debug, Error)]
pub enum LiveTailError {
    /// A transport unit could not be framed (empty or oversized header).
    #[error("Framing error: {0}")]
    Framing(String),

    /// The reassembled byte stream is not a valid message sequence.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The streaming endpoint could not be reached or failed mid-stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// `start()` was called without a usable stream name or endpoint.
    #[error("Invalid session request: {0}")]
    InvalidSessionRequest(String),

    /// JSON serialization/deserialization error (ticket payloads, config).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ArrowError> for LiveTailError {
    fn from(err: ArrowError) -> Self {
        LiveTailError::Decode(err.to_string())
    }
}

impl From<tonic::Status> for LiveTailError {
    fn from(status: tonic::Status) -> Self {
        LiveTailError::Transport(format!("{:?}: {}", status.code(), status.message()))
    }
}

impl From<tonic::transport::Error> for LiveTailError {
    fn from(err: tonic::transport::Error) -> Self {
        LiveTailError::Transport(err.to_string())
    }
}

/// Result type alias using LiveTailError.
pub type Result<T> = std::result::Result<T, LiveTailError>;
