//! The `PollJob` trait.

use async_trait::async_trait;

use chainstream_core::{ChainSource, Publication, SourceError, StreamKind};

/// One periodic read cycle for a single stream kind.
///
/// A job owns its dedup state; it is moved into its runner task and never
/// shared. Returning an error, or an empty list, publishes nothing. On error
/// the job must leave its state as it was before the call.
///
/// `Sync` because the runner's future borrows the job across its publishes
/// and must stay `Send` to be spawned.
#[async_trait]
pub trait PollJob: Send + Sync + 'static {
    fn kind(&self) -> StreamKind;

    async fn poll(&mut self, source: &dyn ChainSource) -> Result<Vec<Publication>, SourceError>;
}
