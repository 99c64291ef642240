//! The `ChainSource` trait — the poll jobs' only view of the upstream chain.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SourceError;
use crate::types::{BlockHeader, BlockTag, FullBlock};

/// Chain-state reads used by the poll jobs.
///
/// Every call may fail transiently; callers treat any error as "skip this tick".
/// Implementations must be `Send + Sync` so one source can be shared by all
/// poll job tasks.
#[async_trait]
pub trait ChainSource: Send + Sync + 'static {
    /// The current chain head, summary view (transaction hashes only).
    async fn latest_head(&self) -> Result<BlockHeader, SourceError>;

    /// The block at `number` with full transaction bodies.
    async fn block_with_transactions(&self, number: u64) -> Result<FullBlock, SourceError>;

    /// The full pending-transaction pool, as opaque JSON records.
    async fn pending_transactions(&self) -> Result<Vec<Value>, SourceError>;

    /// Event logs in `[from, to]`, as opaque JSON records.
    async fn logs_in_range(&self, from: BlockTag, to: BlockTag) -> Result<Vec<Value>, SourceError>;

    async fn chain_id(&self) -> Result<u64, SourceError>;

    /// The current head block number.
    async fn block_number(&self) -> Result<u64, SourceError>;

    async fn peer_count(&self) -> Result<u64, SourceError>;

    /// `false` when in sync, otherwise the node's sync progress object.
    async fn sync_status(&self) -> Result<Value, SourceError>;

    /// Suggested gas price in wei.
    async fn suggested_gas_price(&self) -> Result<u128, SourceError>;
}
