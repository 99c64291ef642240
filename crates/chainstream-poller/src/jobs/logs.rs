//! Recent event logs job.

use async_trait::async_trait;

use chainstream_core::envelope::LogsPayload;
use chainstream_core::{
    BlockTag, ChainSource, MessageEnvelope, Payload, Publication, SourceError, StreamKind,
};

use super::now_secs;
use crate::job::PollJob;

/// Queries logs from `max(0, head - lookback)` to `latest` each tick.
///
/// Consecutive windows overlap, so a log may appear in several messages.
#[derive(Debug)]
pub struct LogsJob {
    lookback: u64,
    limit: usize,
}

impl LogsJob {
    pub fn new(lookback: u64, limit: usize) -> Self {
        Self { lookback, limit }
    }
}

impl Default for LogsJob {
    fn default() -> Self {
        Self::new(5, 100)
    }
}

#[async_trait]
impl PollJob for LogsJob {
    fn kind(&self) -> StreamKind {
        StreamKind::Logs
    }

    async fn poll(&mut self, source: &dyn ChainSource) -> Result<Vec<Publication>, SourceError> {
        let head = source.block_number().await?;
        let from_block = head.saturating_sub(self.lookback);

        let mut logs = source
            .logs_in_range(BlockTag::Number(from_block), BlockTag::Latest)
            .await?;
        if logs.is_empty() {
            return Ok(Vec::new());
        }

        let count = logs.len();
        logs.truncate(self.limit);
        let payload = LogsPayload {
            count,
            logs,
            from_block,
            to_block: head,
            timestamp: now_secs(),
        };
        Ok(vec![Publication::primary(MessageEnvelope::new(
            StreamKind::Logs,
            Payload::Logs(payload),
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::MockSource;
    use serde_json::json;

    #[tokio::test]
    async fn queries_lookback_window_to_latest() {
        let source = MockSource::at_head(1000);
        *source.logs.lock().unwrap() = (0..250).map(|i| json!({ "logIndex": i })).collect();

        let pubs = LogsJob::default().poll(&source).await.unwrap();

        assert_eq!(
            source.log_queries.lock().unwrap()[0],
            (BlockTag::Number(995), BlockTag::Latest)
        );
        match &pubs[0].envelope.payload {
            Payload::Logs(p) => {
                assert_eq!(p.from_block, 995);
                assert_eq!(p.to_block, 1000);
                assert_eq!(p.count, 250);
                assert_eq!(p.logs.len(), 100);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn window_saturates_at_genesis() {
        let source = MockSource::at_head(3);
        *source.logs.lock().unwrap() = vec![json!({})];

        let pubs = LogsJob::default().poll(&source).await.unwrap();
        let v = serde_json::to_value(&pubs[0].envelope.payload).unwrap();
        assert_eq!(v["fromBlock"], 0);
        assert_eq!(v["toBlock"], 3);
    }

    #[tokio::test]
    async fn no_logs_publishes_nothing() {
        let source = MockSource::at_head(10);
        assert!(LogsJob::default().poll(&source).await.unwrap().is_empty());
    }
}
