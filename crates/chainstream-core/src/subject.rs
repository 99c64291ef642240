//! Durable-log subjects.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A durable-log address. Every published envelope belongs to exactly one subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(Cow<'static, str>);

impl Subject {
    pub const BLOCKS_FULL: &'static str = "eth.blocks.full";
    pub const BLOCKS_SIMPLE: &'static str = "eth.blocks";
    pub const PENDING: &'static str = "eth.pending";
    pub const LOGS: &'static str = "eth.logs";
    pub const NETWORK: &'static str = "eth.network";
    pub const GAS_PRICE: &'static str = "eth.gasPrice";

    pub const fn from_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into()))
    }

    pub fn blocks_full() -> Self {
        Self::from_static(Self::BLOCKS_FULL)
    }

    pub fn blocks_simple() -> Self {
        Self::from_static(Self::BLOCKS_SIMPLE)
    }

    pub fn pending() -> Self {
        Self::from_static(Self::PENDING)
    }

    pub fn logs() -> Self {
        Self::from_static(Self::LOGS)
    }

    pub fn network() -> Self {
        Self::from_static(Self::NETWORK)
    }

    pub fn gas_price() -> Self {
        Self::from_static(Self::GAS_PRICE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
