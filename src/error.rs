//! Error types for the feedstore read-model service

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while applying events or serving metrics
#[derive(Error, Debug)]
pub enum Error {
    /// Durable-store round trip failed (transient; the event must be
    /// left unacknowledged so the transport redelivers it)
    #[error("read store error: {0}")]
    Store(String),

    /// Message transport failure (transient)
    #[error("transport error: {0}")]
    Transport(String),

    /// Wire payload could not be decoded into a domain event
    /// (poison message; redelivery cannot help)
    #[error("event deserialization failed: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// Unexpected/programming error; fatal for the current event but
    /// must never crash the consumer process
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the underlying event should be redelivered.
    ///
    /// Transient infrastructure failures are retryable; a payload that
    /// cannot be decoded never will be, no matter how often it comes back.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(_) | Error::Transport(_) | Error::Internal(_) => true,
            Error::Deserialize(_) => false,
        }
    }
}
