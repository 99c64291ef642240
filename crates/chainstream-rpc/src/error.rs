use thiserror::Error;

use chainstream_core::SourceError;

use crate::request::RpcFault;

/// Failure of a single call to the node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, reset, TLS failure.
    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("node answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The node rejected the call with a JSON-RPC error object.
    #[error("node fault {}: {}", .0.code, .0.message)]
    Fault(RpcFault),

    #[error("no reply within {ms}ms")]
    Timeout { ms: u64 },

    /// The reply body was not a JSON-RPC reply.
    #[error("undecodable reply: {0}")]
    Decode(String),
}

impl From<TransportError> for SourceError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Fault(fault) => SourceError::Rpc {
                code: fault.code,
                message: fault.message,
            },
            TransportError::Timeout { ms } => SourceError::Timeout { ms },
            other @ (TransportError::Unreachable(_)
            | TransportError::Status { .. }
            | TransportError::Decode(_)) => SourceError::Transport(other.to_string()),
        }
    }
}
