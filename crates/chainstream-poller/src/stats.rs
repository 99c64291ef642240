//! Per-job counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use chainstream_core::StreamKind;

/// Counters updated by one job's runner, readable from anywhere.
#[derive(Debug)]
pub struct JobStats {
    kind: StreamKind,
    ticks: AtomicU64,
    published: AtomicU64,
    skipped: AtomicU64,
    upstream_errors: AtomicU64,
    publish_errors: AtomicU64,
}

/// Point-in-time copy of [`JobStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatsSnapshot {
    pub kind: StreamKind,
    pub ticks: u64,
    pub published: u64,
    /// Ticks that produced nothing to publish.
    pub skipped: u64,
    pub upstream_errors: u64,
    pub publish_errors: u64,
}

impl JobStats {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            ticks: AtomicU64::new(0),
            published: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            upstream_errors: AtomicU64::new(0),
            publish_errors: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_upstream_error(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> JobStatsSnapshot {
        JobStatsSnapshot {
            kind: self.kind,
            ticks: self.ticks.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
        }
    }
}
