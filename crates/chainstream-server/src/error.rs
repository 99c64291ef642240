//! Server error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use chainstream_log::LogError;

/// Failure to open a relay for a subscriber.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Only returned when unknown names are rejected instead of falling back.
    #[error("unknown stream: {0}")]
    UnknownStream(String),

    #[error("failed to subscribe: {0}")]
    Log(#[from] LogError),
}

/// Failure to run the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP-facing error: a status and a JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    known: Option<Vec<&'static str>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::UnknownStream(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: e.to_string(),
                known: Some(
                    chainstream_core::StreamDirectory::new()
                        .entries()
                        .iter()
                        .flat_map(|entry| entry.names.iter().copied())
                        .collect(),
                ),
            },
            BridgeError::Log(_) => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: e.to_string(),
                known: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.known {
            Some(streams) => json!({ "error": self.message, "streams": streams }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}
