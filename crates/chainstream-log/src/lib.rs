//! chainstream-log — the durable, replayable multi-subject log.
//!
//! Poll jobs append payload bytes to a [`Subject`](chainstream_core::Subject);
//! relays tail it. Two backends implement [`DurableLog`]:
//!
//! - [`MemoryLog`] — in-process, exact retention, used by default and in tests
//! - `RedisLog` — Redis Streams, one consumer group per subscription
//!   (feature `redis`)
//!
//! Sequence numbers are strictly increasing per subject, starting at 1.

pub mod error;
pub mod log;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_log;

pub use error::LogError;
pub use log::{DeliverPolicy, Delivery, DurableLog, PublishAck, Retention, Subscription};
pub use memory::MemoryLog;
#[cfg(feature = "redis")]
pub use redis_log::RedisLog;
