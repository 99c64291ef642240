//! Error types shared across the pipeline.

use thiserror::Error;

/// A transient failure reading from the upstream chain source.
///
/// Never fatal to a poll job: the tick is skipped and the next scheduled
/// tick retries.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("upstream read timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("malformed {method} response: {reason}")]
    Malformed { method: String, reason: String },

    #[error("block {0} not found")]
    BlockNotFound(u64),
}

impl SourceError {
    pub fn malformed(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            method: method.into(),
            reason: reason.into(),
        }
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
