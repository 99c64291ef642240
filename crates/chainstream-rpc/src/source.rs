//! `RpcChainSource` — [`ChainSource`] over an EVM JSON-RPC endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

use chainstream_core::types::{parse_hex_u128, parse_hex_u64};
use chainstream_core::{BlockHeader, BlockTag, ChainSource, FullBlock, SourceError, Transaction};

use crate::error::TransportError;
use crate::request::RpcCall;
use crate::transport::RpcTransport;

/// EVM chain source issuing one JSON-RPC call per read.
pub struct RpcChainSource<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> RpcChainSource<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }

    async fn call(&self, method: &'static str, params: Vec<Value>) -> Result<Value, SourceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .transport
            .send(RpcCall::new(id, method, params))
            .await?;
        resp.into_result()
            .map_err(|e| SourceError::from(TransportError::Fault(e)))
    }

    async fn call_quantity(&self, method: &'static str) -> Result<u64, SourceError> {
        let v = self.call(method, vec![]).await?;
        let s = v
            .as_str()
            .ok_or_else(|| SourceError::malformed(method, "expected hex quantity"))?;
        parse_hex_u64(s).ok_or_else(|| SourceError::malformed(method, format!("bad quantity {s}")))
    }
}

#[async_trait]
impl<T: RpcTransport> ChainSource for RpcChainSource<T> {
    async fn latest_head(&self) -> Result<BlockHeader, SourceError> {
        let v = self
            .call("eth_getBlockByNumber", vec![json!("latest"), json!(false)])
            .await?;
        if v.is_null() {
            return Err(SourceError::malformed("eth_getBlockByNumber", "no latest block"));
        }
        header_from_json(&v)
    }

    async fn block_with_transactions(&self, number: u64) -> Result<FullBlock, SourceError> {
        let v = self
            .call(
                "eth_getBlockByNumber",
                vec![json!(BlockTag::Number(number).to_param()), json!(true)],
            )
            .await?;
        if v.is_null() {
            return Err(SourceError::BlockNotFound(number));
        }
        full_block_from_json(&v)
    }

    async fn pending_transactions(&self) -> Result<Vec<Value>, SourceError> {
        let v = self.call("eth_pendingTransactions", vec![]).await?;
        records(v, "eth_pendingTransactions")
    }

    async fn logs_in_range(&self, from: BlockTag, to: BlockTag) -> Result<Vec<Value>, SourceError> {
        let filter = json!({
            "fromBlock": from.to_param(),
            "toBlock": to.to_param(),
        });
        let v = self.call("eth_getLogs", vec![filter]).await?;
        records(v, "eth_getLogs")
    }

    async fn chain_id(&self) -> Result<u64, SourceError> {
        self.call_quantity("eth_chainId").await
    }

    async fn block_number(&self) -> Result<u64, SourceError> {
        self.call_quantity("eth_blockNumber").await
    }

    async fn peer_count(&self) -> Result<u64, SourceError> {
        self.call_quantity("net_peerCount").await
    }

    async fn sync_status(&self) -> Result<Value, SourceError> {
        self.call("eth_syncing", vec![]).await
    }

    async fn suggested_gas_price(&self) -> Result<u128, SourceError> {
        let v = self.call("eth_gasPrice", vec![]).await?;
        let s = v
            .as_str()
            .ok_or_else(|| SourceError::malformed("eth_gasPrice", "expected hex quantity"))?;
        parse_hex_u128(s)
            .ok_or_else(|| SourceError::malformed("eth_gasPrice", format!("bad quantity {s}")))
    }
}

// ─── Response parsing ─────────────────────────────────────────────────────────

const BLOCK_METHOD: &str = "eth_getBlockByNumber";

/// A `null` list is treated as empty; some nodes answer that way.
fn records(v: Value, method: &str) -> Result<Vec<Value>, SourceError> {
    match v {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        _ => Err(SourceError::malformed(method, "expected array")),
    }
}

fn field_str<'a>(v: &'a Value, field: &str) -> Result<&'a str, SourceError> {
    v.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::malformed(BLOCK_METHOD, format!("missing {field}")))
}

fn field_u64(v: &Value, field: &str) -> Result<u64, SourceError> {
    let s = field_str(v, field)?;
    parse_hex_u64(s)
        .ok_or_else(|| SourceError::malformed(BLOCK_METHOD, format!("bad {field}: {s}")))
}

fn field_u128(v: &Value, field: &str) -> Result<u128, SourceError> {
    let s = field_str(v, field)?;
    parse_hex_u128(s)
        .ok_or_else(|| SourceError::malformed(BLOCK_METHOD, format!("bad {field}: {s}")))
}

/// Optional quantity; absent fields (post-merge `difficulty`, etc.) read as zero.
fn opt_u128(v: &Value, field: &str) -> Result<u128, SourceError> {
    match v.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(_) => field_u128(v, field),
    }
}

fn opt_u64(v: &Value, field: &str) -> Result<u64, SourceError> {
    match v.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(_) => field_u64(v, field),
    }
}

/// Convert a JSON block object to a [`BlockHeader`].
pub fn header_from_json(v: &Value) -> Result<BlockHeader, SourceError> {
    Ok(BlockHeader {
        number: field_u64(v, "number")?,
        hash: field_str(v, "hash")?.to_string(),
        parent_hash: field_str(v, "parentHash")?.to_string(),
        timestamp: field_u64(v, "timestamp")?,
        gas_used: field_u64(v, "gasUsed")?,
        gas_limit: field_u64(v, "gasLimit")?,
        difficulty: opt_u128(v, "difficulty")?,
        size: opt_u64(v, "size")?,
        tx_count: v["transactions"].as_array().map(Vec::len).unwrap_or(0),
    })
}

fn transaction_from_json(v: &Value) -> Result<Transaction, SourceError> {
    let gas_price = match v.get("gasPrice") {
        Some(Value::String(_)) => field_u128(v, "gasPrice")?,
        _ => opt_u128(v, "maxFeePerGas")?,
    };
    Ok(Transaction {
        hash: field_str(v, "hash")?.to_string(),
        to: v.get("to").and_then(Value::as_str).map(str::to_string),
        value: opt_u128(v, "value")?,
        gas_price,
        gas: field_u64(v, "gas")?,
        nonce: field_u64(v, "nonce")?,
    })
}

/// Convert a JSON block object fetched with full transactions to a [`FullBlock`].
pub fn full_block_from_json(v: &Value) -> Result<FullBlock, SourceError> {
    let header = header_from_json(v)?;
    let transactions = v["transactions"]
        .as_array()
        .map(|txs| txs.iter().map(transaction_from_json).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    Ok(FullBlock {
        header,
        transactions,
    })
}
