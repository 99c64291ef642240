//! The closed set of stream kinds produced by the poll jobs.

use serde::{Deserialize, Serialize};

use crate::subject::Subject;

/// One logical data kind. Each kind has exactly one poll job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    Blocks,
    PendingTransactions,
    Logs,
    NetworkStats,
    GasPrice,
}

impl StreamKind {
    /// All kinds, in job start order.
    pub const ALL: [StreamKind; 5] = [
        StreamKind::Blocks,
        StreamKind::PendingTransactions,
        StreamKind::Logs,
        StreamKind::NetworkStats,
        StreamKind::GasPrice,
    ];

    /// Wire name of the kind, also used as the `kind` field in log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::PendingTransactions => "pending",
            Self::Logs => "logs",
            Self::NetworkStats => "network",
            Self::GasPrice => "gasPrice",
        }
    }

    /// The subject this kind publishes its primary payload to.
    pub fn subject(&self) -> Subject {
        match self {
            Self::Blocks => Subject::blocks_full(),
            Self::PendingTransactions => Subject::pending(),
            Self::Logs => Subject::logs(),
            Self::NetworkStats => Subject::network(),
            Self::GasPrice => Subject::gas_price(),
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
