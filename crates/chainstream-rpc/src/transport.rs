//! The `RpcTransport` trait.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{RpcCall, RpcReply};

/// Delivers one call to the node and returns its reply. Faults in the reply
/// are left for the caller to inspect.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn send(&self, call: RpcCall) -> Result<RpcReply, TransportError>;

    /// The endpoint this transport talks to, for log lines.
    fn url(&self) -> &str;
}
