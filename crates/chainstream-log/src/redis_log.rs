//! Redis Streams durable log.
//!
//! Each subject is one Redis stream (`chainstream:<subject>`). Publishes take
//! a per-subject sequence from `INCR <stream>:seq` and append with
//! `XADD MAXLEN ~`, then trim by age with `XTRIM MINID ~`. Every subscription
//! gets its own consumer group, created at `$` (new only) or `0` (replay) and
//! destroyed when the subscription is dropped.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::streams::{StreamId, StreamMaxlen, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chainstream_core::Subject;

use crate::error::LogError;
use crate::log::{
    AckBackend, Acker, DeliverPolicy, Delivery, DurableLog, PublishAck, Retention, Subscription,
};

const KEY_PREFIX: &str = "chainstream:";
// Stays under the async client's response timeout; an empty read just loops.
const READ_BLOCK: Duration = Duration::from_millis(250);
const READ_BATCH: usize = 64;

static SUBSCRIPTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// [`DurableLog`] backed by Redis Streams.
#[derive(Clone)]
pub struct RedisLog {
    client: redis::Client,
    conn: ConnectionManager,
    retention: Retention,
}

impl RedisLog {
    /// Connect and verify the server answers `PING`.
    pub async fn connect(url: &str, retention: Retention) -> Result<Self, LogError> {
        let client = redis::Client::open(url)
            .map_err(|e| LogError::Unavailable(format!("invalid redis url {url}: {e}")))?;
        let mut conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| LogError::Unavailable(format!("failed to connect to {url}: {e}")))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        tracing::info!(url, "connected to redis");
        Ok(Self {
            client,
            conn,
            retention,
        })
    }

    fn key(subject: &Subject) -> String {
        format!("{KEY_PREFIX}{subject}")
    }
}

#[async_trait]
impl DurableLog for RedisLog {
    async fn publish(&self, subject: &Subject, payload: Bytes) -> Result<PublishAck, LogError> {
        let mut conn = self.conn.clone();
        let key = Self::key(subject);
        let now = Utc::now();

        let sequence: u64 = conn.incr(format!("{key}:seq"), 1u64).await?;
        let fields: [(&str, Vec<u8>); 3] = [
            ("seq", sequence.to_string().into_bytes()),
            ("ts", now.timestamp_millis().to_string().into_bytes()),
            ("payload", payload.to_vec()),
        ];
        let _id: String = conn
            .xadd_maxlen(
                &key,
                StreamMaxlen::Approx(self.retention.max_messages),
                "*",
                &fields,
            )
            .await?;

        let _trimmed: i64 = redis::cmd("XTRIM")
            .arg(&key)
            .arg("MINID")
            .arg("~")
            .arg(trim_min_id(&self.retention, now))
            .query_async(&mut conn)
            .await?;

        tracing::trace!(subject = %subject, sequence, "committed");
        Ok(PublishAck {
            subject: subject.clone(),
            sequence,
        })
    }

    async fn subscribe(
        &self,
        subject: &Subject,
        policy: DeliverPolicy,
    ) -> Result<Subscription, LogError> {
        let key = Self::key(subject);
        let n = SUBSCRIPTION_COUNTER.fetch_add(1, Ordering::Relaxed);
        let group = format!("relay-{}-{}-{n}", std::process::id(), Utc::now().timestamp_millis());
        let start = match policy {
            DeliverPolicy::New => "$",
            DeliverPolicy::All => "0",
        };

        let mut admin = self.conn.clone();
        let _: () = admin.xgroup_create_mkstream(&key, &group, start).await?;

        // Blocking reads get a dedicated connection so they never stall publishes.
        let conn = self.client.get_multiplexed_async_connection().await?;

        let acked = Arc::new(AtomicU64::new(0));
        let reader = GroupReader {
            subject: subject.clone(),
            conn,
            options: StreamReadOptions::default()
                .group(&group, "relay")
                .block(READ_BLOCK.as_millis() as usize)
                .count(READ_BATCH),
            buffer: VecDeque::new(),
            acked: Arc::clone(&acked),
            guard: GroupGuard {
                conn: admin,
                key: key.clone(),
                group: group.clone(),
            },
            key,
            failed: false,
        };

        tracing::debug!(subject = %subject, group = %group, ?policy, "consumer group created");
        Ok(Subscription::new(
            subject.clone(),
            policy,
            acked,
            reader.into_stream().boxed(),
        ))
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Lowest stream id kept at `now`. Entry ids are `<millis>-<n>`, so a cutoff
/// before the epoch trims nothing.
fn trim_min_id(retention: &Retention, now: DateTime<Utc>) -> String {
    format!("{}-0", retention.cutoff(now).timestamp_millis().max(0))
}

/// The fields `publish` writes into one stream entry.
#[derive(Debug, PartialEq)]
struct EntryFields {
    sequence: u64,
    published_at: DateTime<Utc>,
    payload: Bytes,
}

impl EntryFields {
    fn parse(entry: &StreamId) -> Result<Self, LogError> {
        let malformed = |field: &str| {
            LogError::Serialization(format!("stream entry {} missing {field}", entry.id))
        };
        let sequence: u64 = entry.get("seq").ok_or_else(|| malformed("seq"))?;
        let millis: i64 = entry.get("ts").ok_or_else(|| malformed("ts"))?;
        let payload: Vec<u8> = entry.get("payload").ok_or_else(|| malformed("payload"))?;
        let published_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| malformed("ts"))?;
        Ok(Self {
            sequence,
            published_at,
            payload: Bytes::from(payload),
        })
    }
}

/// `XACK` for one stream entry.
pub(crate) struct StreamAck {
    conn: MultiplexedConnection,
    key: String,
    group: String,
    id: String,
}

impl std::fmt::Debug for StreamAck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamAck")
            .field("key", &self.key)
            .field("group", &self.group)
            .field("id", &self.id)
            .finish()
    }
}

impl StreamAck {
    pub(crate) async fn ack(mut self) -> Result<(), LogError> {
        let _: i64 = self.conn.xack(&self.key, &self.group, &[&self.id]).await?;
        Ok(())
    }
}

/// Destroys the subscription's consumer group when dropped.
struct GroupGuard {
    conn: ConnectionManager,
    key: String,
    group: String,
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let mut conn = self.conn.clone();
        let key = std::mem::take(&mut self.key);
        let group = std::mem::take(&mut self.group);
        handle.spawn(async move {
            let res: redis::RedisResult<i64> = conn.xgroup_destroy(&key, &group).await;
            if let Err(e) = res {
                tracing::warn!(
                    key = %key,
                    group = %group,
                    error = %e,
                    "failed to destroy consumer group"
                );
            }
        });
    }
}

struct GroupReader {
    subject: Subject,
    conn: MultiplexedConnection,
    key: String,
    options: StreamReadOptions,
    buffer: VecDeque<StreamId>,
    acked: Arc<AtomicU64>,
    guard: GroupGuard,
    failed: bool,
}

impl GroupReader {
    fn into_stream(self) -> impl futures::Stream<Item = Result<Delivery, LogError>> + Send {
        futures::stream::unfold(self, |mut reader| async move {
            if reader.failed {
                return None;
            }
            let item = reader.next_delivery().await;
            if item.is_err() {
                reader.failed = true;
            }
            Some((item, reader))
        })
    }

    async fn next_delivery(&mut self) -> Result<Delivery, LogError> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return self.decode(entry);
            }
            let reply: StreamReadReply = self
                .conn
                .xread_options(&[&self.key], &[">"], &self.options)
                .await?;
            self.buffer
                .extend(reply.keys.into_iter().flat_map(|k| k.ids));
        }
    }

    fn decode(&self, entry: StreamId) -> Result<Delivery, LogError> {
        let fields = EntryFields::parse(&entry)?;
        let ack = StreamAck {
            conn: self.conn.clone(),
            key: self.guard.key.clone(),
            group: self.guard.group.clone(),
            id: entry.id,
        };
        Ok(Delivery::new(
            self.subject.clone(),
            fields.sequence,
            fields.payload,
            fields.published_at,
            Acker::new(Arc::clone(&self.acked), AckBackend::Redis(ack)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::Value;
    use std::collections::HashMap;

    fn entry(fields: &[(&str, &str)]) -> StreamId {
        let map: HashMap<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::BulkString(v.as_bytes().to_vec())))
            .collect();
        StreamId {
            id: "1700000000000-0".into(),
            map,
            ..Default::default()
        }
    }

    #[test]
    fn well_formed_entry_decodes() {
        let fields = EntryFields::parse(&entry(&[
            ("seq", "42"),
            ("ts", "1700000000123"),
            ("payload", r#"{"number":"7"}"#),
        ]))
        .unwrap();
        assert_eq!(fields.sequence, 42);
        assert_eq!(fields.published_at.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(fields.payload.as_ref(), br#"{"number":"7"}"#);
    }

    #[test]
    fn each_missing_field_is_a_serialization_error() {
        let full = [("seq", "1"), ("ts", "1700000000000"), ("payload", "{}")];
        for missing in ["seq", "ts", "payload"] {
            let kept: Vec<_> = full.iter().copied().filter(|(k, _)| *k != missing).collect();
            match EntryFields::parse(&entry(&kept)) {
                Err(LogError::Serialization(msg)) => {
                    assert!(msg.contains(missing), "{msg}");
                    assert!(msg.contains("1700000000000-0"), "{msg}");
                }
                other => panic!("missing {missing}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn unparseable_sequence_is_rejected() {
        let bad = entry(&[("seq", "x"), ("ts", "1"), ("payload", "{}")]);
        assert!(matches!(
            EntryFields::parse(&bad),
            Err(LogError::Serialization(msg)) if msg.contains("seq")
        ));
    }

    #[test]
    fn cutoff_before_epoch_trims_nothing() {
        let retention = Retention {
            max_age: Duration::from_secs(3600),
            max_messages: 10,
        };
        let early = Utc.timestamp_millis_opt(60_000).single().unwrap();
        assert_eq!(trim_min_id(&retention, early), "0-0");
    }

    #[test]
    fn min_id_is_cutoff_millis() {
        let retention = Retention {
            max_age: Duration::from_secs(60),
            max_messages: 10,
        };
        let now = Utc.timestamp_millis_opt(1_700_000_060_000).single().unwrap();
        assert_eq!(trim_min_id(&retention, now), "1700000000000-0");
    }
}
