//! Gas price job.

use async_trait::async_trait;

use chainstream_core::envelope::GasPricePayload;
use chainstream_core::{ChainSource, MessageEnvelope, Payload, Publication, SourceError, StreamKind};

use super::now_secs;
use crate::job::PollJob;

#[derive(Debug, Default)]
pub struct GasPriceJob;

impl GasPriceJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PollJob for GasPriceJob {
    fn kind(&self) -> StreamKind {
        StreamKind::GasPrice
    }

    async fn poll(&mut self, source: &dyn ChainSource) -> Result<Vec<Publication>, SourceError> {
        let wei = source.suggested_gas_price().await?;
        Ok(vec![Publication::primary(MessageEnvelope::new(
            StreamKind::GasPrice,
            Payload::GasPrice(GasPricePayload::from_wei(wei, now_secs())),
        ))])
    }
}
