//! Pending-transactions job.

use async_trait::async_trait;

use chainstream_core::envelope::PendingPayload;
use chainstream_core::{ChainSource, MessageEnvelope, Payload, Publication, SourceError, StreamKind};

use super::now_secs;
use crate::job::PollJob;

/// Snapshots the pending pool. Publishes nothing when the pool is empty;
/// otherwise the pool size and at most `limit` transactions.
#[derive(Debug)]
pub struct PendingJob {
    limit: usize,
}

impl PendingJob {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Default for PendingJob {
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait]
impl PollJob for PendingJob {
    fn kind(&self) -> StreamKind {
        StreamKind::PendingTransactions
    }

    async fn poll(&mut self, source: &dyn ChainSource) -> Result<Vec<Publication>, SourceError> {
        let mut transactions = source.pending_transactions().await?;
        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let count = transactions.len();
        transactions.truncate(self.limit);
        let payload = PendingPayload {
            count,
            transactions,
            timestamp: now_secs(),
        };
        Ok(vec![Publication::primary(MessageEnvelope::new(
            StreamKind::PendingTransactions,
            Payload::Pending(payload),
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::MockSource;
    use serde_json::json;

    fn pool(n: usize) -> Vec<serde_json::Value> {
        (0..n).map(|i| json!({ "hash": format!("0x{i:x}") })).collect()
    }

    #[tokio::test]
    async fn empty_pool_publishes_nothing() {
        let source = MockSource::default();
        assert!(PendingJob::default().poll(&source).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn count_is_pool_size_and_list_is_capped() {
        for (n, shown) in [(3usize, 3usize), (50, 50), (120, 50)] {
            let source = MockSource::default();
            *source.pending.lock().unwrap() = pool(n);

            let pubs = PendingJob::default().poll(&source).await.unwrap();
            assert_eq!(pubs.len(), 1);
            match &pubs[0].envelope.payload {
                Payload::Pending(p) => {
                    assert_eq!(p.count, n);
                    assert_eq!(p.transactions.len(), shown);
                    assert_eq!(p.transactions[0]["hash"], "0x0");
                }
                other => panic!("unexpected payload {other:?}"),
            }
        }
    }
}
