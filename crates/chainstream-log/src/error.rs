//! Durable log error types.

use thiserror::Error;

/// A failed publish, subscribe or ack.
///
/// Publish failures are logged by the caller and the message is dropped.
#[derive(Debug, Error)]
pub enum LogError {
    /// The backend could not be reached.
    #[error("log backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the message.
    #[error("publish to {subject} rejected: {reason}")]
    Rejected { subject: String, reason: String },

    #[error("log operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// A payload could not be encoded, or a stored entry could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
