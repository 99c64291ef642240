//! Stream directory — logical stream name → log subject.
//!
//! The table is fixed at compile time. Names a subscriber may ask for:
//!
//! | name            | subject           |
//! |-----------------|-------------------|
//! | `blocks`        | `eth.blocks.full` |
//! | `pending`       | `eth.pending`     |
//! | `logs`          | `eth.logs`        |
//! | `network`       | `eth.network`     |
//! | `gasPrice`/`gas`| `eth.gasPrice`    |
//! | `blocks-simple` | `eth.blocks`      |
//!
//! Unknown names fall back to [`StreamDirectory::default_subject`]. Callers
//! that prefer to reject them check [`Resolution::fallback`].

use serde::Serialize;

use crate::subject::Subject;

/// One row of the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEntry {
    /// Names that resolve to this entry; the first is canonical.
    pub names: &'static [&'static str],
    pub subject: Subject,
    pub description: &'static str,
}

impl StreamEntry {
    pub fn name(&self) -> &'static str {
        self.names[0]
    }

    /// `"<subject> - <description>"`, the form listed by the directory endpoint.
    pub fn summary(&self) -> String {
        format!("{} - {}", self.subject, self.description)
    }
}

/// Outcome of resolving a logical stream name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub subject: Subject,
    /// `true` when the name was unknown and the default subject was used.
    pub fallback: bool,
}

static ENTRIES: &[StreamEntry] = &[
    StreamEntry {
        names: &["blocks"],
        subject: Subject::from_static(Subject::BLOCKS_FULL),
        description: "Full block data with transactions",
    },
    StreamEntry {
        names: &["pending"],
        subject: Subject::from_static(Subject::PENDING),
        description: "Pending transactions",
    },
    StreamEntry {
        names: &["logs"],
        subject: Subject::from_static(Subject::LOGS),
        description: "Recent event logs",
    },
    StreamEntry {
        names: &["network"],
        subject: Subject::from_static(Subject::NETWORK),
        description: "Network statistics",
    },
    StreamEntry {
        names: &["gasPrice", "gas"],
        subject: Subject::from_static(Subject::GAS_PRICE),
        description: "Current gas price",
    },
    StreamEntry {
        names: &["blocks-simple"],
        subject: Subject::from_static(Subject::BLOCKS_SIMPLE),
        description: "Simple block data",
    },
];

/// The static name → subject table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamDirectory;

impl StreamDirectory {
    pub fn new() -> Self {
        Self
    }

    /// Stream used for unknown names and for requests that name no stream.
    pub const DEFAULT_STREAM: &'static str = "blocks";

    pub fn default_subject(&self) -> Subject {
        Subject::blocks_full()
    }

    pub fn entries(&self) -> &'static [StreamEntry] {
        ENTRIES
    }

    /// Exact lookup; `None` for unknown names. Matching is case-sensitive.
    pub fn lookup(&self, name: &str) -> Option<&'static StreamEntry> {
        ENTRIES.iter().find(|e| e.names.iter().any(|n| *n == name))
    }

    /// Resolve a name, falling back to the default subject when unknown.
    pub fn resolve(&self, name: &str) -> Resolution {
        match self.lookup(name) {
            Some(entry) => Resolution {
                subject: entry.subject.clone(),
                fallback: false,
            },
            None => Resolution {
                subject: self.default_subject(),
                fallback: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        let dir = StreamDirectory::new();
        assert_eq!(dir.resolve("blocks").subject.as_str(), "eth.blocks.full");
        assert_eq!(dir.resolve("pending").subject.as_str(), "eth.pending");
        assert_eq!(dir.resolve("logs").subject.as_str(), "eth.logs");
        assert_eq!(dir.resolve("network").subject.as_str(), "eth.network");
        assert_eq!(dir.resolve("blocks-simple").subject.as_str(), "eth.blocks");
        assert!(!dir.resolve("logs").fallback);
    }

    #[test]
    fn gas_alias() {
        let dir = StreamDirectory::new();
        assert_eq!(dir.resolve("gas"), dir.resolve("gasPrice"));
        assert_eq!(dir.lookup("gas").unwrap().name(), "gasPrice");
    }

    #[test]
    fn unknown_name_falls_back_to_blocks() {
        let dir = StreamDirectory::new();
        let r = dir.resolve("blokcs");
        assert!(r.fallback);
        assert_eq!(r.subject, dir.default_subject());
        assert!(dir.lookup("blokcs").is_none());
    }

    #[test]
    fn summary_format() {
        let dir = StreamDirectory::new();
        let entry = dir.lookup("pending").unwrap();
        assert_eq!(entry.summary(), "eth.pending - Pending transactions");
    }
}
