//! Chain data types returned by a [`ChainSource`](crate::source::ChainSource).

use serde::{Deserialize, Serialize};

// ─── BlockHeader ──────────────────────────────────────────────────────────────

/// Block metadata, as returned by `eth_getBlockByNumber(_, false)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    /// Block hash (`0x…`).
    pub hash: String,
    /// Parent block hash (`0x…`).
    pub parent_hash: String,
    /// Unix timestamp of the block (seconds since epoch).
    pub timestamp: u64,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub difficulty: u128,
    /// Encoded block size in bytes.
    pub size: u64,
    /// Number of transactions (hashes only in the summary view).
    pub tx_count: usize,
}

// ─── Transaction ──────────────────────────────────────────────────────────────

/// A transaction body from a full block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    /// `None` for contract creation.
    pub to: Option<String>,
    /// Value in wei.
    pub value: u128,
    /// Gas price in wei (effective price for typed transactions when present).
    pub gas_price: u128,
    /// Gas limit.
    pub gas: u64,
    pub nonce: u64,
}

/// A block together with its full transaction bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullBlock {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

// ─── BlockTag ─────────────────────────────────────────────────────────────────

/// Upper or lower bound of a block range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl BlockTag {
    /// The JSON-RPC parameter form (`"latest"` or a hex quantity).
    pub fn to_param(&self) -> String {
        match self {
            Self::Latest => "latest".to_string(),
            Self::Number(n) => format!("0x{n:x}"),
        }
    }
}

// ─── Quantity helpers ─────────────────────────────────────────────────────────

/// Parse a hex quantity (with or without `0x`) into a u64.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Parse a hex quantity (with or without `0x`) into a u128.
pub fn parse_hex_u128(s: &str) -> Option<u128> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quantities() {
        assert_eq!(parse_hex_u64("0x1"), Some(1));
        assert_eq!(parse_hex_u64("0xff"), Some(255));
        assert_eq!(parse_hex_u64("0x"), Some(0));
        assert_eq!(parse_hex_u64("0xzz"), None);
        assert_eq!(parse_hex_u128("0x4a817c800"), Some(20_000_000_000));
    }

    #[test]
    fn block_tag_params() {
        assert_eq!(BlockTag::Latest.to_param(), "latest");
        assert_eq!(BlockTag::Number(95).to_param(), "0x5f");
    }
}
