//! chainstream-core — shared vocabulary for the poll → publish → fan-out bridge.
//!
//! # Architecture
//!
//! ```text
//! ChainSource (JSON-RPC reads)
//!       │
//!       ▼
//! PollJob × 5 (one per StreamKind, private dedup cursor)
//!       │  MessageEnvelope → Subject
//!       ▼
//! DurableLog (append-only, per-subject retention)
//!       │  tail "new only"
//!       ▼
//! FanoutBridge (one relay per subscriber) ── StreamDirectory (name → subject)
//! ```
//!
//! This crate holds the types every other crate agrees on: stream kinds,
//! subjects, payloads, the stream directory, the upstream source contract
//! and configuration.

pub mod config;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod kind;
pub mod source;
pub mod subject;
pub mod types;

pub use config::ChainStreamConfig;
pub use directory::{Resolution, StreamDirectory, StreamEntry};
pub use envelope::{MessageEnvelope, Payload, Publication};
pub use error::{ConfigError, SourceError};
pub use kind::StreamKind;
pub use source::ChainSource;
pub use subject::Subject;
pub use types::{BlockHeader, BlockTag, FullBlock, Transaction};
