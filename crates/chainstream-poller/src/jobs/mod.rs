//! The five poll jobs.

pub mod blocks;
pub mod gas_price;
pub mod logs;
pub mod network;
pub mod pending;

pub use blocks::BlocksJob;
pub use gas_price::GasPriceJob;
pub use logs::LogsJob;
pub use network::NetworkStatsJob;
pub use pending::PendingJob;

/// Payload timestamps are Unix seconds, the same unit as a block's own
/// `timestamp`.
pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use chainstream_core::{BlockHeader, BlockTag, ChainSource, FullBlock, SourceError, Transaction};

    /// Scriptable in-memory chain. Methods listed in `failing` return a
    /// transport error.
    #[derive(Default)]
    pub struct MockSource {
        pub head: Mutex<u64>,
        pub pending: Mutex<Vec<Value>>,
        pub logs: Mutex<Vec<Value>>,
        pub gas_price: Mutex<u128>,
        pub failing: Mutex<HashSet<&'static str>>,
        pub missing_blocks: Mutex<HashSet<u64>>,
        pub log_queries: Mutex<Vec<(BlockTag, BlockTag)>>,
    }

    impl MockSource {
        pub fn at_head(head: u64) -> Self {
            let source = Self::default();
            *source.head.lock().unwrap() = head;
            source
        }

        pub fn set_head(&self, head: u64) {
            *self.head.lock().unwrap() = head;
        }

        pub fn fail(&self, method: &'static str) {
            self.failing.lock().unwrap().insert(method);
        }

        pub fn heal(&self, method: &'static str) {
            self.failing.lock().unwrap().remove(method);
        }

        fn check(&self, method: &'static str) -> Result<(), SourceError> {
            if self.failing.lock().unwrap().contains(method) {
                Err(SourceError::Transport(format!("{method} unavailable")))
            } else {
                Ok(())
            }
        }

        fn header(number: u64, tx_count: usize) -> BlockHeader {
            BlockHeader {
                number,
                hash: format!("0x{number:064x}"),
                parent_hash: format!("0x{:064x}", number.saturating_sub(1)),
                timestamp: 1_700_000_000 + number,
                gas_used: 21_000 * tx_count as u64,
                gas_limit: 30_000_000,
                difficulty: 0,
                size: 512,
                tx_count,
            }
        }
    }

    #[async_trait]
    impl ChainSource for MockSource {
        async fn latest_head(&self) -> Result<BlockHeader, SourceError> {
            self.check("latest_head")?;
            Ok(Self::header(*self.head.lock().unwrap(), 2))
        }

        async fn block_with_transactions(&self, number: u64) -> Result<FullBlock, SourceError> {
            self.check("block_with_transactions")?;
            if self.missing_blocks.lock().unwrap().contains(&number) {
                return Err(SourceError::BlockNotFound(number));
            }
            let transactions = (0..2u64)
                .map(|i| Transaction {
                    hash: format!("0x{number:x}{i:02x}"),
                    to: Some("0xbeef".into()),
                    value: 1_000_000_000_000_000_000,
                    gas_price: 20_000_000_000,
                    gas: 21_000,
                    nonce: i,
                })
                .collect();
            Ok(FullBlock {
                header: Self::header(number, 2),
                transactions,
            })
        }

        async fn pending_transactions(&self) -> Result<Vec<Value>, SourceError> {
            self.check("pending_transactions")?;
            Ok(self.pending.lock().unwrap().clone())
        }

        async fn logs_in_range(
            &self,
            from: BlockTag,
            to: BlockTag,
        ) -> Result<Vec<Value>, SourceError> {
            self.check("logs_in_range")?;
            self.log_queries.lock().unwrap().push((from, to));
            Ok(self.logs.lock().unwrap().clone())
        }

        async fn chain_id(&self) -> Result<u64, SourceError> {
            self.check("chain_id")?;
            Ok(50312)
        }

        async fn block_number(&self) -> Result<u64, SourceError> {
            self.check("block_number")?;
            Ok(*self.head.lock().unwrap())
        }

        async fn peer_count(&self) -> Result<u64, SourceError> {
            self.check("peer_count")?;
            Ok(12)
        }

        async fn sync_status(&self) -> Result<Value, SourceError> {
            self.check("sync_status")?;
            Ok(Value::Bool(false))
        }

        async fn suggested_gas_price(&self) -> Result<u128, SourceError> {
            self.check("suggested_gas_price")?;
            Ok(*self.gas_price.lock().unwrap())
        }
    }
}
