//! `JobRunner` — drives one poll job on its own timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use chainstream_core::{ChainSource, Publication, StreamKind};
use chainstream_log::{DurableLog, LogError, PublishAck};

use crate::job::PollJob;
use crate::stats::JobStats;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The read cycle succeeded; this many publications were committed
    /// (failed publishes are dropped and not counted).
    Published(usize),
    /// The read cycle succeeded but there was nothing new.
    Skipped,
    /// The read cycle failed or timed out; job state is unchanged.
    UpstreamFailed,
}

/// Owns one [`PollJob`] and runs it every `period` until shutdown.
///
/// The first tick fires one period after [`run`](Self::run) starts. Ticks
/// never overlap; a tick that overruns its period causes the missed ticks to
/// be skipped.
pub struct JobRunner {
    job: Box<dyn PollJob>,
    source: Arc<dyn ChainSource>,
    log: Arc<dyn DurableLog>,
    period: Duration,
    upstream_timeout: Duration,
    publish_timeout: Duration,
    stats: Arc<JobStats>,
}

impl JobRunner {
    pub fn new(
        job: Box<dyn PollJob>,
        source: Arc<dyn ChainSource>,
        log: Arc<dyn DurableLog>,
        period: Duration,
    ) -> Self {
        let stats = Arc::new(JobStats::new(job.kind()));
        Self {
            job,
            source,
            log,
            period,
            upstream_timeout: Duration::from_secs(10),
            publish_timeout: Duration::from_secs(5),
            stats,
        }
    }

    pub fn with_timeouts(mut self, upstream: Duration, publish: Duration) -> Self {
        self.upstream_timeout = upstream;
        self.publish_timeout = publish;
        self
    }

    pub fn kind(&self) -> StreamKind {
        self.stats.kind()
    }

    pub fn stats(&self) -> Arc<JobStats> {
        Arc::clone(&self.stats)
    }

    /// Run until `shutdown` is cancelled. An in-flight tick is abandoned on
    /// cancellation.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let kind = self.kind();
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            kind = kind.tag(),
            period_ms = self.period.as_millis() as u64,
            "poll job started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.tick() => {}
            }
        }

        tracing::info!(kind = kind.tag(), "poll job stopped");
    }

    /// One read cycle plus its publishes.
    pub async fn tick(&mut self) -> TickOutcome {
        let kind = self.kind();
        self.stats.record_tick();

        let polled =
            tokio::time::timeout(self.upstream_timeout, self.job.poll(self.source.as_ref())).await;
        let publications = match polled {
            Ok(Ok(publications)) => publications,
            Ok(Err(e)) => {
                self.stats.record_upstream_error();
                tracing::warn!(
                    kind = kind.tag(),
                    error = %e,
                    "upstream read failed; skipping tick"
                );
                return TickOutcome::UpstreamFailed;
            }
            Err(_) => {
                self.stats.record_upstream_error();
                tracing::warn!(
                    kind = kind.tag(),
                    timeout_ms = self.upstream_timeout.as_millis() as u64,
                    "upstream read timed out; skipping tick"
                );
                return TickOutcome::UpstreamFailed;
            }
        };

        if publications.is_empty() {
            self.stats.record_skipped();
            return TickOutcome::Skipped;
        }

        let mut committed = 0;
        for publication in &publications {
            match self.publish(publication).await {
                Ok(ack) => {
                    committed += 1;
                    self.stats.record_published();
                    tracing::debug!(
                        kind = kind.tag(),
                        subject = %ack.subject,
                        sequence = ack.sequence,
                        "published"
                    );
                }
                Err(e) => {
                    self.stats.record_publish_error();
                    tracing::warn!(
                        kind = kind.tag(),
                        subject = %publication.subject,
                        error = %e,
                        "publish failed; message dropped"
                    );
                }
            }
        }
        TickOutcome::Published(committed)
    }

    async fn publish(&self, publication: &Publication) -> Result<PublishAck, LogError> {
        let bytes = publication
            .envelope
            .encode()
            .map_err(|e| LogError::Serialization(e.to_string()))?;

        tokio::time::timeout(self.publish_timeout, self.log.publish(&publication.subject, bytes))
            .await
            .map_err(|_| LogError::Timeout {
                ms: self.publish_timeout.as_millis() as u64,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::MockSource;
    use crate::jobs::{BlocksJob, GasPriceJob};
    use async_trait::async_trait;
    use bytes::Bytes;
    use chainstream_core::Subject;
    use chainstream_log::{DeliverPolicy, MemoryLog, Subscription};

    struct RejectingLog;

    #[async_trait]
    impl DurableLog for RejectingLog {
        async fn publish(
            &self,
            subject: &Subject,
            _payload: Bytes,
        ) -> Result<PublishAck, LogError> {
            Err(LogError::Rejected {
                subject: subject.to_string(),
                reason: "full".into(),
            })
        }

        async fn subscribe(&self, _: &Subject, _: DeliverPolicy) -> Result<Subscription, LogError> {
            Err(LogError::Unavailable("write-only".into()))
        }

        fn backend(&self) -> &'static str {
            "rejecting"
        }
    }

    fn runner(
        job: Box<dyn PollJob>,
        source: Arc<MockSource>,
        log: Arc<dyn DurableLog>,
    ) -> JobRunner {
        JobRunner::new(job, source, log, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn tick_outcomes_are_counted() {
        let source = Arc::new(MockSource::at_head(10));
        let log = Arc::new(MemoryLog::default());
        let mut r = runner(Box::new(BlocksJob::new()), Arc::clone(&source), log.clone());

        assert_eq!(r.tick().await, TickOutcome::Published(1));
        assert_eq!(r.tick().await, TickOutcome::Skipped);
        source.fail("latest_head");
        assert_eq!(r.tick().await, TickOutcome::UpstreamFailed);

        let snap = r.stats().snapshot();
        assert_eq!((snap.ticks, snap.published, snap.skipped, snap.upstream_errors), (3, 1, 1, 1));
        assert_eq!(log.retained(&Subject::blocks_full()), 1);
    }

    #[tokio::test]
    async fn publish_failure_drops_message_but_keeps_cursor() {
        let source = Arc::new(MockSource::at_head(10));
        let mut r = runner(Box::new(BlocksJob::new()), Arc::clone(&source), Arc::new(RejectingLog));

        assert_eq!(r.tick().await, TickOutcome::Published(0));
        // Height 10 is not retried after a failed publish.
        assert_eq!(r.tick().await, TickOutcome::Skipped);
        assert_eq!(r.stats().snapshot().publish_errors, 1);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn runner_futures_can_be_spawned() {
        let log: Arc<dyn DurableLog> = Arc::new(MemoryLog::default());
        let mut r = runner(Box::new(BlocksJob::new()), Arc::new(MockSource::default()), log);
        assert_send(&r.tick());
        assert_send(&r.run(CancellationToken::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown() {
        let source = Arc::new(MockSource::default());
        *source.gas_price.lock().unwrap() = 1;
        let r = runner(Box::new(GasPriceJob::new()), source, Arc::new(MemoryLog::default()));
        let stats = r.stats();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(r.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(35)).await;
        shutdown.cancel();
        task.await.unwrap();

        // First tick one period after start: ticks at 10, 20, 30 ms.
        assert_eq!(stats.snapshot().ticks, 3);
    }
}
