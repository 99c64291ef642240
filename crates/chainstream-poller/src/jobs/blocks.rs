//! Blocks job: publish each new chain head once, with full transactions.

use async_trait::async_trait;

use chainstream_core::envelope::BlockPayload;
use chainstream_core::{
    ChainSource, MessageEnvelope, Payload, Publication, SourceError, StreamKind, Subject,
};

use crate::cursor::BlockCursor;
use crate::job::PollJob;

/// Reads the head, and if its height is new, re-reads that height with full
/// transaction bodies and publishes it to `eth.blocks.full`.
///
/// The cursor advances before the publish is attempted; a failed publish
/// does not cause the height to be re-published.
#[derive(Debug, Default)]
pub struct BlocksJob {
    cursor: BlockCursor,
    publish_simple: bool,
}

impl BlocksJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also publish the transaction-less payload to `eth.blocks`.
    pub fn with_simple_blocks(mut self, enabled: bool) -> Self {
        self.publish_simple = enabled;
        self
    }

    pub fn cursor(&self) -> BlockCursor {
        self.cursor
    }
}

#[async_trait]
impl PollJob for BlocksJob {
    fn kind(&self) -> StreamKind {
        StreamKind::Blocks
    }

    async fn poll(&mut self, source: &dyn ChainSource) -> Result<Vec<Publication>, SourceError> {
        let head = source.latest_head().await?;
        if !self.cursor.is_new(head.number) {
            tracing::trace!(number = head.number, "head unchanged");
            return Ok(Vec::new());
        }

        let full = source.block_with_transactions(head.number).await?;
        let payload = BlockPayload::from(&full);
        self.cursor.advance(head.number);

        tracing::debug!(
            number = head.number,
            txs = payload.transactions.len(),
            "new block"
        );

        let summary = self.publish_simple.then(|| payload.block.clone());
        let mut out = vec![Publication::primary(MessageEnvelope::new(
            StreamKind::Blocks,
            Payload::Block(payload),
        ))];
        if let Some(summary) = summary {
            out.push(Publication::to(
                Subject::blocks_simple(),
                MessageEnvelope::new(StreamKind::Blocks, Payload::SimpleBlock(summary)),
            ));
        }
        Ok(out)
    }
}
