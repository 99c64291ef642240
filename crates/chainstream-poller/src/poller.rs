//! `Poller` — builds the five jobs and spawns one task per job.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use chainstream_core::config::PollerConfig;
use chainstream_core::{ChainSource, StreamKind};
use chainstream_log::DurableLog;

use crate::job::PollJob;
use crate::jobs::{BlocksJob, GasPriceJob, LogsJob, NetworkStatsJob, PendingJob};
use crate::runner::JobRunner;
use crate::stats::{JobStats, JobStatsSnapshot};

pub struct Poller;

impl Poller {
    /// One job per stream kind, configured from `config`.
    pub fn jobs(config: &PollerConfig) -> Vec<Box<dyn PollJob>> {
        StreamKind::ALL
            .iter()
            .map(|kind| -> Box<dyn PollJob> {
                match kind {
                    StreamKind::Blocks => {
                        Box::new(BlocksJob::new().with_simple_blocks(config.publish_simple_blocks))
                    }
                    StreamKind::PendingTransactions => {
                        Box::new(PendingJob::new(config.pending_limit))
                    }
                    StreamKind::Logs => {
                        Box::new(LogsJob::new(config.logs_lookback, config.logs_limit))
                    }
                    StreamKind::NetworkStats => Box::new(NetworkStatsJob::new()),
                    StreamKind::GasPrice => Box::new(GasPriceJob::new()),
                }
            })
            .collect()
    }

    /// Spawn every job on the current runtime. Jobs run until `shutdown` is
    /// cancelled.
    pub fn spawn(
        config: &PollerConfig,
        source: Arc<dyn ChainSource>,
        log: Arc<dyn DurableLog>,
        shutdown: CancellationToken,
    ) -> PollerHandle {
        let mut tasks = JoinSet::new();
        let mut stats = Vec::with_capacity(StreamKind::ALL.len());

        for job in Self::jobs(config) {
            let period = config.interval(job.kind());
            let runner = JobRunner::new(job, Arc::clone(&source), Arc::clone(&log), period)
                .with_timeouts(config.upstream_timeout(), config.publish_timeout());
            stats.push(runner.stats());
            tasks.spawn(runner.run(shutdown.clone()));
        }

        tracing::info!(jobs = stats.len(), log = log.backend(), "poller started");
        PollerHandle {
            tasks,
            stats,
            shutdown,
        }
    }
}

/// Handle to the running poll jobs.
pub struct PollerHandle {
    tasks: JoinSet<()>,
    stats: Vec<Arc<JobStats>>,
    shutdown: CancellationToken,
}

impl PollerHandle {
    /// Counters for every job, in [`StreamKind::ALL`] order.
    pub fn stats(&self) -> Vec<JobStatsSnapshot> {
        self.stats.iter().map(|s| s.snapshot()).collect()
    }

    /// Cancel every job. Equivalent to cancelling the token given to
    /// [`Poller::spawn`].
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait for every job to exit, aborting any still running after `grace`.
    /// Does not itself cancel the jobs.
    pub async fn join(mut self, grace: Duration) -> Vec<JobStatsSnapshot> {
        let drained = tokio::time::timeout(grace, drain(&mut self.tasks)).await;
        if drained.is_err() {
            tracing::warn!(
                remaining = self.tasks.len(),
                grace_ms = grace.as_millis() as u64,
                "poll jobs did not stop in time; aborting"
            );
            self.tasks.abort_all();
            drain(&mut self.tasks).await;
        }
        self.stats()
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            if e.is_panic() {
                tracing::error!(error = %e, "poll job panicked");
            }
        }
    }
}
