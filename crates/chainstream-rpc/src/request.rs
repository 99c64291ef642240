//! Wire shapes for the JSON-RPC 2.0 calls made against the node.
//!
//! Only the subset a poller needs: numeric ids, positional params, and a
//! reply that is either a result or a fault.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const VERSION: &str = "2.0";

/// One outgoing call.
#[derive(Debug, Clone, Serialize)]
pub struct RpcCall {
    jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: Vec<Value>,
}

impl RpcCall {
    pub fn new(id: u64, method: &'static str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: VERSION,
            id,
            method,
            params,
        }
    }
}

/// Error object returned by the node in place of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcFault {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The node's answer to one [`RpcCall`].
///
/// The id is kept as raw JSON: some nodes echo it as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcReply {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcFault>,
}

impl RpcReply {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id: Value::from(id),
            result: Some(result),
            error: None,
        }
    }

    /// A missing `result` reads as JSON `null` (e.g. unknown block).
    pub fn into_result(self) -> Result<Value, RpcFault> {
        match self.error {
            Some(fault) => Err(fault),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_carries_version_and_positional_params() {
        let params = vec![Value::from("latest"), Value::from(false)];
        let call = RpcCall::new(7, "eth_getBlockByNumber", params);
        let v = serde_json::to_value(&call).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], 7);
        assert_eq!(v["params"], serde_json::json!(["latest", false]));
    }

    #[test]
    fn null_block_is_a_result_not_a_fault() {
        let reply: RpcReply =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"3","result":null}"#).unwrap();
        assert_eq!(reply.id, "3");
        assert_eq!(reply.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn fault_wins_over_result() {
        let reply: RpcReply = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"header not found"}}"#,
        )
        .unwrap();
        let fault = reply.into_result().unwrap_err();
        assert_eq!(fault.code, -32000);
        assert_eq!(fault.message, "header not found");
    }
}
