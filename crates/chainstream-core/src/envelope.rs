//! Message envelopes and the per-kind payload shapes.
//!
//! The bytes committed to the durable log are the JSON encoding of the
//! payload alone; the envelope's kind and timestamp travel as log metadata.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::StreamKind;
use crate::subject::Subject;
use crate::types::{FullBlock, Transaction};

// ─── Payloads ─────────────────────────────────────────────────────────────────

/// Block metadata without transaction bodies. Published alone on the
/// "simple" blocks subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummaryPayload {
    #[serde(with = "decimal")]
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: u64,
    pub gas_used: u64,
    pub gas_limit: u64,
    #[serde(with = "decimal")]
    pub difficulty: u128,
    pub size: u64,
    pub tx_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    pub hash: String,
    pub to: Option<String>,
    #[serde(with = "decimal")]
    pub value: u128,
    #[serde(with = "decimal")]
    pub gas_price: u128,
    pub gas: u64,
    pub nonce: u64,
}

impl From<&Transaction> for TransactionPayload {
    fn from(tx: &Transaction) -> Self {
        Self {
            hash: tx.hash.clone(),
            to: tx.to.clone(),
            value: tx.value,
            gas_price: tx.gas_price,
            gas: tx.gas,
            nonce: tx.nonce,
        }
    }
}

/// Full block payload: metadata plus every transaction in the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    #[serde(flatten)]
    pub block: BlockSummaryPayload,
    pub transactions: Vec<TransactionPayload>,
}

impl From<&FullBlock> for BlockPayload {
    fn from(full: &FullBlock) -> Self {
        let h = &full.header;
        Self {
            block: BlockSummaryPayload {
                number: h.number,
                hash: h.hash.clone(),
                parent_hash: h.parent_hash.clone(),
                timestamp: h.timestamp,
                gas_used: h.gas_used,
                gas_limit: h.gas_limit,
                difficulty: h.difficulty,
                size: h.size,
                tx_count: full.transactions.len(),
            },
            transactions: full.transactions.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayload {
    /// Size of the whole pending pool, not of `transactions`.
    pub count: usize,
    pub transactions: Vec<Value>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsPayload {
    /// Number of logs that matched, not of `logs`.
    pub count: usize,
    pub logs: Vec<Value>,
    pub from_block: u64,
    pub to_block: u64,
    pub timestamp: i64,
}

/// Best-effort network metadata. A field whose read failed is omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Wei, decimal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syncing: Option<Value>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPricePayload {
    /// Raw suggested price in wei.
    #[serde(with = "decimal")]
    pub gas_price: u128,
    /// The same price in gwei.
    pub gwei: f64,
    pub timestamp: i64,
}

impl GasPricePayload {
    pub fn from_wei(wei: u128, timestamp: i64) -> Self {
        Self {
            gas_price: wei,
            gwei: wei as f64 / 1e9,
            timestamp,
        }
    }
}

/// Any payload a poll job can produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Block(BlockPayload),
    SimpleBlock(BlockSummaryPayload),
    Pending(PendingPayload),
    Logs(LogsPayload),
    NetworkStats(NetworkStatsPayload),
    GasPrice(GasPricePayload),
}

// ─── Envelope ─────────────────────────────────────────────────────────────────

/// One immutable message produced by a poll job.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    pub kind: StreamKind,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

impl MessageEnvelope {
    pub fn new(kind: StreamKind, payload: Payload) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// JSON bytes of the payload, as written to the log.
    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(&self.payload).map(Bytes::from)
    }
}

/// An envelope bound for a specific subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub subject: Subject,
    pub envelope: MessageEnvelope,
}

impl Publication {
    /// Publish `envelope` to its kind's primary subject.
    pub fn primary(envelope: MessageEnvelope) -> Self {
        Self {
            subject: envelope.kind.subject(),
            envelope,
        }
    }

    pub fn to(subject: Subject, envelope: MessageEnvelope) -> Self {
        Self { subject, envelope }
    }
}

/// Serialize integers as decimal strings (wei amounts exceed JSON's safe range).
mod decimal {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T: Display, S: Serializer>(
        value: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockHeader;

    fn full_block() -> FullBlock {
        FullBlock {
            header: BlockHeader {
                number: 100,
                hash: "0xaaa".into(),
                parent_hash: "0x999".into(),
                timestamp: 1_700_000_000,
                gas_used: 21_000,
                gas_limit: 30_000_000,
                difficulty: 0,
                size: 1024,
                tx_count: 1,
            },
            transactions: vec![Transaction {
                hash: "0xt1".into(),
                to: None,
                value: 1_000_000_000_000_000_000_000,
                gas_price: 20_000_000_000,
                gas: 21_000,
                nonce: 7,
            }],
        }
    }

    #[test]
    fn block_payload_wire_shape() {
        let payload = BlockPayload::from(&full_block());
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["number"], "100");
        assert_eq!(v["parentHash"], "0x999");
        assert_eq!(v["txCount"], 1);
        assert_eq!(v["transactions"][0]["value"], "1000000000000000000000");
        assert_eq!(v["transactions"][0]["gasPrice"], "20000000000");
        assert!(v["transactions"][0]["to"].is_null());
    }

    #[test]
    fn gas_price_derives_gwei() {
        let payload = GasPricePayload::from_wei(20_000_000_000, 0);
        assert_eq!(payload.gwei, 20.0);
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["gasPrice"], "20000000000");
    }

    #[test]
    fn network_stats_omits_failed_fields() {
        let payload = NetworkStatsPayload {
            chain_id: Some(50312),
            timestamp: 1,
            ..Default::default()
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["chainId"], 50312);
        assert!(v.get("peerCount").is_none());
        assert!(v.get("gasPrice").is_none());
    }

    #[test]
    fn envelope_encodes_payload_only() {
        let env = MessageEnvelope::new(
            StreamKind::GasPrice,
            Payload::GasPrice(GasPricePayload::from_wei(1_000_000_000, 5)),
        );
        let decoded: GasPricePayload = serde_json::from_slice(&env.encode().unwrap()).unwrap();
        assert_eq!(decoded.gwei, 1.0);
        assert_eq!(decoded.timestamp, 5);
    }
}
