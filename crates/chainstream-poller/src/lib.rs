//! chainstream-poller — the poll → dedup → publish half of ChainStream.
//!
//! One [`PollJob`] per [`StreamKind`](chainstream_core::StreamKind), each
//! driven by its own [`JobRunner`] task at a fixed cadence:
//!
//! | Job | Default period | Subject(s) |
//! |-----|----------------|------------|
//! | [`BlocksJob`] | 2 s | `eth.blocks.full` (+ `eth.blocks`) |
//! | [`PendingJob`] | 3 s | `eth.pending` |
//! | [`LogsJob`] | 5 s | `eth.logs` |
//! | [`NetworkStatsJob`] | 10 s | `eth.network` |
//! | [`GasPriceJob`] | 15 s | `eth.gasPrice` |
//!
//! Jobs share nothing but the source and the log. A failed or stalled tick
//! in one job never delays another.

pub mod cursor;
pub mod job;
pub mod jobs;
pub mod poller;
pub mod runner;
pub mod stats;

pub use cursor::BlockCursor;
pub use job::PollJob;
pub use jobs::{BlocksJob, GasPriceJob, LogsJob, NetworkStatsJob, PendingJob};
pub use poller::{Poller, PollerHandle};
pub use runner::{JobRunner, TickOutcome};
pub use stats::{JobStats, JobStatsSnapshot};
