//! Network statistics job.

use async_trait::async_trait;

use chainstream_core::envelope::NetworkStatsPayload;
use chainstream_core::{ChainSource, MessageEnvelope, Payload, Publication, SourceError, StreamKind};

use super::now_secs;
use crate::job::PollJob;

/// Issues the five metadata reads concurrently and publishes whatever came
/// back. Each failed read leaves its field absent; the job itself never fails.
#[derive(Debug, Default)]
pub struct NetworkStatsJob;

impl NetworkStatsJob {
    pub fn new() -> Self {
        Self
    }
}

fn best_effort<T>(field: &'static str, res: Result<T, SourceError>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(field, error = %e, "network stat unavailable");
            None
        }
    }
}

#[async_trait]
impl PollJob for NetworkStatsJob {
    fn kind(&self) -> StreamKind {
        StreamKind::NetworkStats
    }

    async fn poll(&mut self, source: &dyn ChainSource) -> Result<Vec<Publication>, SourceError> {
        let (chain_id, block_number, gas_price, peer_count, syncing) = tokio::join!(
            source.chain_id(),
            source.block_number(),
            source.suggested_gas_price(),
            source.peer_count(),
            source.sync_status(),
        );

        let payload = NetworkStatsPayload {
            chain_id: best_effort("chainId", chain_id),
            block_number: best_effort("blockNumber", block_number),
            gas_price: best_effort("gasPrice", gas_price).map(|wei| wei.to_string()),
            peer_count: best_effort("peerCount", peer_count),
            syncing: best_effort("syncing", syncing),
            timestamp: now_secs(),
        };
        Ok(vec![Publication::primary(MessageEnvelope::new(
            StreamKind::NetworkStats,
            Payload::NetworkStats(payload),
        ))])
    }
}
