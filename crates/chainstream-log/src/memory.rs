//! In-process durable log.
//!
//! Each subject keeps its retained window in a `VecDeque` and fans new
//! entries out over a `tokio::sync::broadcast` channel. A subscriber that
//! falls behind the channel is caught up from the retained window, so a slow
//! reader never blocks the publisher or other readers.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use chainstream_core::Subject;

use crate::error::LogError;
use crate::log::{
    AckBackend, Acker, DeliverPolicy, Delivery, DurableLog, PublishAck, Retention, Subscription,
};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    sequence: u64,
    payload: Bytes,
    published_at: DateTime<Utc>,
}

struct SubjectLog {
    entries: VecDeque<Entry>,
    last_sequence: u64,
    tx: broadcast::Sender<Entry>,
}

impl SubjectLog {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            entries: VecDeque::new(),
            last_sequence: 0,
            tx,
        }
    }

    fn evict(&mut self, retention: &Retention, now: DateTime<Utc>) {
        while self.entries.len() > retention.max_messages {
            self.entries.pop_front();
        }
        let cutoff = retention.cutoff(now);
        while self
            .entries
            .front()
            .is_some_and(|e| e.published_at < cutoff)
        {
            self.entries.pop_front();
        }
    }

    fn after(&self, sequence: u64) -> VecDeque<Entry> {
        self.entries
            .iter()
            .filter(|e| e.sequence > sequence)
            .cloned()
            .collect()
    }
}

type Subjects = Arc<Mutex<HashMap<Subject, SubjectLog>>>;

/// In-process [`DurableLog`] with exact per-subject retention.
#[derive(Clone)]
pub struct MemoryLog {
    subjects: Subjects,
    retention: Retention,
    channel_capacity: usize,
}

impl MemoryLog {
    pub fn new(retention: Retention) -> Self {
        Self {
            subjects: Arc::new(Mutex::new(HashMap::new())),
            retention,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Live fan-out buffer per subject. Readers further behind than this are
    /// recovered from the retained window.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Number of messages currently retained for `subject`.
    pub fn retained(&self, subject: &Subject) -> usize {
        let mut subjects = self.subjects.lock();
        match subjects.get_mut(subject) {
            Some(log) => {
                log.evict(&self.retention, Utc::now());
                log.entries.len()
            }
            None => 0,
        }
    }

    fn append(&self, subject: &Subject, payload: Bytes, now: DateTime<Utc>) -> PublishAck {
        let mut subjects = self.subjects.lock();
        let capacity = self.channel_capacity;
        let log = subjects
            .entry(subject.clone())
            .or_insert_with(|| SubjectLog::new(capacity));

        log.last_sequence += 1;
        let entry = Entry {
            sequence: log.last_sequence,
            payload,
            published_at: now,
        };
        log.entries.push_back(entry.clone());
        log.evict(&self.retention, now);
        // No receivers is fine; the entry is retained either way.
        let _ = log.tx.send(entry);

        PublishAck {
            subject: subject.clone(),
            sequence: log.last_sequence,
        }
    }

    fn open(&self, subject: &Subject, policy: DeliverPolicy, now: DateTime<Utc>) -> Subscription {
        let (rx, backlog, last_seen) = {
            let mut subjects = self.subjects.lock();
            let capacity = self.channel_capacity;
            let log = subjects
                .entry(subject.clone())
                .or_insert_with(|| SubjectLog::new(capacity));
            log.evict(&self.retention, now);
            // Receiver and position are taken under the same lock as the
            // snapshot, so nothing published in between is lost or repeated.
            let rx = log.tx.subscribe();
            match policy {
                DeliverPolicy::New => (rx, VecDeque::new(), log.last_sequence),
                DeliverPolicy::All => (rx, log.after(0), 0),
            }
        };

        let acked = Arc::new(AtomicU64::new(0));
        let tail = Tail {
            subject: subject.clone(),
            subjects: Arc::clone(&self.subjects),
            rx: BroadcastStream::new(rx),
            backlog,
            last_seen,
            acked: Arc::clone(&acked),
        };

        Subscription::new(subject.clone(), policy, acked, tail.into_stream().boxed())
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new(Retention::default())
    }
}

#[async_trait]
impl DurableLog for MemoryLog {
    async fn publish(&self, subject: &Subject, payload: Bytes) -> Result<PublishAck, LogError> {
        let ack = self.append(subject, payload, Utc::now());
        tracing::trace!(subject = %subject, sequence = ack.sequence, "committed");
        Ok(ack)
    }

    async fn subscribe(
        &self,
        subject: &Subject,
        policy: DeliverPolicy,
    ) -> Result<Subscription, LogError> {
        Ok(self.open(subject, policy, Utc::now()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Read state of one subscription.
struct Tail {
    subject: Subject,
    subjects: Subjects,
    rx: BroadcastStream<Entry>,
    backlog: VecDeque<Entry>,
    last_seen: u64,
    acked: Arc<AtomicU64>,
}

impl Tail {
    fn into_stream(self) -> impl futures::Stream<Item = Result<Delivery, LogError>> + Send {
        futures::stream::unfold(self, |mut tail| async move {
            let entry = tail.next_entry().await?;
            let delivery = tail.deliver(entry);
            Some((Ok(delivery), tail))
        })
    }

    async fn next_entry(&mut self) -> Option<Entry> {
        loop {
            if let Some(entry) = self.backlog.pop_front() {
                if entry.sequence > self.last_seen {
                    return Some(entry);
                }
                continue;
            }
            match self.rx.next().await? {
                Ok(entry) if entry.sequence > self.last_seen => return Some(entry),
                Ok(_) => continue,
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    tracing::debug!(
                        subject = %self.subject,
                        missed,
                        "subscriber lagged; replaying retained window"
                    );
                    self.recover();
                }
            }
        }
    }

    fn recover(&mut self) {
        let subjects = self.subjects.lock();
        let Some(log) = subjects.get(&self.subject) else {
            return;
        };
        self.backlog = log.after(self.last_seen);
        if let Some(first) = self.backlog.front() {
            if first.sequence > self.last_seen + 1 {
                tracing::warn!(
                    subject = %self.subject,
                    from = self.last_seen + 1,
                    to = first.sequence - 1,
                    "messages evicted before a lagging subscriber could read them"
                );
            }
        }
    }

    fn deliver(&mut self, entry: Entry) -> Delivery {
        self.last_seen = entry.sequence;
        Delivery::new(
            self.subject.clone(),
            entry.sequence,
            entry.payload,
            entry.published_at,
            Acker::new(Arc::clone(&self.acked), AckBackend::Local),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn subject() -> Subject {
        Subject::blocks_full()
    }

    fn small(max_messages: usize, max_age: Duration) -> MemoryLog {
        MemoryLog::new(Retention {
            max_age,
            max_messages,
        })
    }

    async fn next_seq(sub: &mut Subscription) -> u64 {
        tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .expect("timed out waiting for delivery")
            .expect("subscription ended")
            .expect("delivery error")
            .sequence
    }

    #[tokio::test]
    async fn sequences_start_at_one_per_subject() {
        let log = MemoryLog::default();
        let a = log.publish(&subject(), Bytes::from_static(b"1")).await.unwrap();
        let b = log.publish(&subject(), Bytes::from_static(b"2")).await.unwrap();
        let other = log.publish(&Subject::logs(), Bytes::from_static(b"x")).await.unwrap();
        assert_eq!((a.sequence, b.sequence, other.sequence), (1, 2, 1));
    }

    #[test]
    fn evicts_oldest_by_count() {
        let log = small(3, Duration::from_secs(3600));
        let now = Utc::now();
        for i in 0..5u8 {
            log.append(&subject(), Bytes::from(vec![i]), now);
        }
        let subjects = log.subjects.lock();
        let seqs: Vec<u64> = subjects[&subject()].entries.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
    }

    #[test]
    fn evicts_oldest_by_age() {
        let log = small(100, Duration::from_secs(24 * 3600));
        let t0 = Utc::now() - chrono::Duration::hours(30);
        log.append(&subject(), Bytes::from_static(b"old"), t0);
        log.append(&subject(), Bytes::from_static(b"mid"), t0 + chrono::Duration::hours(10));
        log.append(&subject(), Bytes::from_static(b"new"), t0 + chrono::Duration::hours(25));

        let subjects = log.subjects.lock();
        let kept: Vec<&[u8]> = subjects[&subject()]
            .entries
            .iter()
            .map(|e| e.payload.as_ref())
            .collect();
        assert_eq!(kept, vec![b"mid".as_ref(), b"new".as_ref()]);
    }

    #[tokio::test]
    async fn new_policy_skips_earlier_messages() {
        let log = MemoryLog::default();
        log.publish(&subject(), Bytes::from_static(b"m1")).await.unwrap();
        log.publish(&subject(), Bytes::from_static(b"m2")).await.unwrap();

        let mut sub = log.subscribe(&subject(), DeliverPolicy::New).await.unwrap();
        log.publish(&subject(), Bytes::from_static(b"m3")).await.unwrap();

        let d = sub.next().await.unwrap().unwrap();
        assert_eq!(d.sequence, 3);
        assert_eq!(d.payload.as_ref(), b"m3");
    }

    #[tokio::test]
    async fn all_policy_replays_retained_window_then_tails() {
        let log = small(2, Duration::from_secs(3600));
        for p in [b"a", b"b", b"c"] {
            log.publish(&subject(), Bytes::from_static(p)).await.unwrap();
        }
        let mut sub = log.subscribe(&subject(), DeliverPolicy::All).await.unwrap();
        log.publish(&subject(), Bytes::from_static(b"d")).await.unwrap();

        assert_eq!(next_seq(&mut sub).await, 2);
        assert_eq!(next_seq(&mut sub).await, 3);
        assert_eq!(next_seq(&mut sub).await, 4);
    }

    #[tokio::test]
    async fn lagging_subscriber_recovers_in_order() {
        let log = MemoryLog::default().with_channel_capacity(2);
        let mut sub = log.subscribe(&subject(), DeliverPolicy::New).await.unwrap();
        for i in 0..6u8 {
            log.publish(&subject(), Bytes::from(vec![i])).await.unwrap();
        }
        for expected in 1..=6 {
            assert_eq!(next_seq(&mut sub).await, expected);
        }
    }

    #[tokio::test]
    async fn ack_advances_position() {
        let log = MemoryLog::default();
        let mut sub = log.subscribe(&subject(), DeliverPolicy::New).await.unwrap();
        log.publish(&subject(), Bytes::from_static(b"x")).await.unwrap();

        let d = sub.next().await.unwrap().unwrap();
        assert_eq!(sub.last_acked(), 0);
        d.ack().await.unwrap();
        assert_eq!(sub.last_acked(), 1);
    }

    #[tokio::test]
    async fn subjects_are_isolated() {
        let log = MemoryLog::default();
        let mut blocks = log.subscribe(&subject(), DeliverPolicy::New).await.unwrap();
        log.publish(&Subject::gas_price(), Bytes::from_static(b"gas")).await.unwrap();
        log.publish(&subject(), Bytes::from_static(b"block")).await.unwrap();

        let d = blocks.next().await.unwrap().unwrap();
        assert_eq!(d.subject, subject());
        assert_eq!(d.payload.as_ref(), b"block");
        assert_eq!(log.retained(&Subject::gas_price()), 1);
    }
}
