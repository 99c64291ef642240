//! `reqwest`-backed [`RpcTransport`].

use async_trait::async_trait;
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{RpcCall, RpcReply};
use crate::transport::RpcTransport;

/// Posts each call to a single HTTP endpoint.
///
/// Every call is bounded by `request_timeout`; a stalled node surfaces as
/// [`TransportError::Timeout`].
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Unreachable(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
            request_timeout,
        })
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, call: RpcCall) -> Result<RpcReply, TransportError> {
        tracing::trace!(method = call.method, id = call.id, endpoint = %self.endpoint, "rpc call");

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&call)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<RpcReply>().await.map_err(|e| self.classify(e))
    }

    fn url(&self) -> &str {
        &self.endpoint
    }
}
