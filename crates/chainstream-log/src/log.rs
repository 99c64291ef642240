//! The `DurableLog` contract and the values that cross it.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chainstream_core::config::DurableLogConfig;
use chainstream_core::Subject;

use crate::error::LogError;

/// Where a new subscription starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliverPolicy {
    /// Only messages published after the subscription was created.
    #[default]
    New,
    /// Every retained message, then new ones.
    All,
}

/// Acknowledgement of a committed publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    pub subject: Subject,
    pub sequence: u64,
}

/// Per-subject retention window. Oldest messages are evicted first when
/// either bound is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub max_age: Duration,
    pub max_messages: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(24 * 60 * 60),
            max_messages: 10_000,
        }
    }
}

impl From<&DurableLogConfig> for Retention {
    fn from(cfg: &DurableLogConfig) -> Self {
        Self {
            max_age: Duration::from_secs(cfg.max_age_secs),
            max_messages: cfg.max_messages,
        }
    }
}

impl Retention {
    /// Messages published before this instant are expired at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let age = chrono::Duration::from_std(self.max_age).unwrap_or(chrono::Duration::MAX);
        now.checked_sub_signed(age).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Append-only, subject-partitioned log with per-subject retention.
///
/// The only state shared between poll jobs and relays.
#[async_trait]
pub trait DurableLog: Send + Sync + 'static {
    /// Append `payload` to `subject`. Returns once the message is committed.
    async fn publish(&self, subject: &Subject, payload: Bytes) -> Result<PublishAck, LogError>;

    /// Open a subscription on `subject` positioned according to `policy`.
    async fn subscribe(
        &self,
        subject: &Subject,
        policy: DeliverPolicy,
    ) -> Result<Subscription, LogError>;

    /// Short backend name for log lines.
    fn backend(&self) -> &'static str;
}

// ─── Delivery ─────────────────────────────────────────────────────────────────

/// One message handed to a subscriber.
#[derive(Debug)]
pub struct Delivery {
    pub subject: Subject,
    pub sequence: u64,
    pub payload: Bytes,
    pub published_at: DateTime<Utc>,
    acker: Acker,
}

impl Delivery {
    pub(crate) fn new(
        subject: Subject,
        sequence: u64,
        payload: Bytes,
        published_at: DateTime<Utc>,
        acker: Acker,
    ) -> Self {
        Self {
            subject,
            sequence,
            payload,
            published_at,
            acker,
        }
    }

    /// Acknowledge this message to the log.
    pub async fn ack(self) -> Result<(), LogError> {
        self.acker.ack(self.sequence).await
    }
}

/// Backend-specific acknowledgement handle carried by each [`Delivery`].
#[derive(Debug)]
pub(crate) struct Acker {
    acked: Arc<AtomicU64>,
    backend: AckBackend,
}

#[derive(Debug)]
pub(crate) enum AckBackend {
    /// The in-process log only tracks the acked position.
    Local,
    #[cfg(feature = "redis")]
    Redis(crate::redis_log::StreamAck),
}

impl Acker {
    pub(crate) fn new(acked: Arc<AtomicU64>, backend: AckBackend) -> Self {
        Self { acked, backend }
    }

    async fn ack(self, sequence: u64) -> Result<(), LogError> {
        match self.backend {
            AckBackend::Local => {}
            #[cfg(feature = "redis")]
            AckBackend::Redis(ack) => ack.ack().await?,
        }
        self.acked.fetch_max(sequence, Ordering::Relaxed);
        Ok(())
    }
}

// ─── Subscription ─────────────────────────────────────────────────────────────

/// A stream of [`Delivery`] values in publish order.
///
/// Dropping the subscription releases it on the backend.
pub struct Subscription {
    subject: Subject,
    policy: DeliverPolicy,
    acked: Arc<AtomicU64>,
    inner: BoxStream<'static, Result<Delivery, LogError>>,
}

impl Subscription {
    pub(crate) fn new(
        subject: Subject,
        policy: DeliverPolicy,
        acked: Arc<AtomicU64>,
        inner: BoxStream<'static, Result<Delivery, LogError>>,
    ) -> Self {
        Self {
            subject,
            policy,
            acked,
            inner,
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn policy(&self) -> DeliverPolicy {
        self.policy
    }

    /// Highest sequence acknowledged through this subscription (0 if none).
    pub fn last_acked(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }
}

impl Stream for Subscription {
    type Item = Result<Delivery, LogError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("subject", &self.subject)
            .field("policy", &self.policy)
            .field("last_acked", &self.last_acked())
            .finish()
    }
}
