//! chainstream-rpc — the upstream side of ChainStream.
//!
//! - [`RpcTransport`] — async trait for sending one JSON-RPC request
//! - [`HttpTransport`] — `reqwest`-backed transport with a per-request timeout
//! - [`RpcChainSource`] — [`ChainSource`](chainstream_core::ChainSource)
//!   implementation issuing the `eth_*` / `net_*` calls the poll jobs need
//!
//! Failed calls are not retried here: the poll job's next tick is the retry.

pub mod error;
pub mod http;
pub mod request;
pub mod source;
pub mod transport;

pub use error::TransportError;
pub use http::HttpTransport;
pub use request::{RpcCall, RpcFault, RpcReply};
pub use source::RpcChainSource;
pub use transport::RpcTransport;
