//! Process configuration.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields a working configuration against the public Somnia testnet RPC and
//! an in-process log.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::kind::StreamKind;

/// Upstream JSON-RPC endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,
    /// HTTP request timeout for a single JSON-RPC call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_rpc_url() -> String {
    "https://dream-rpc.somnia.network".into()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Which durable log implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogBackend {
    /// In-process log. Retained history is lost on restart.
    #[default]
    Memory,
    /// Redis Streams (requires the `redis` feature).
    Redis,
}

impl std::str::FromStr for LogBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(ConfigError::Invalid(format!("unknown log backend: {other}"))),
        }
    }
}

/// Durable log backend and per-subject retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurableLogConfig {
    #[serde(default)]
    pub backend: LogBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Messages older than this are evicted.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// At most this many messages are retained per subject.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".into()
}

fn default_max_age_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_messages() -> usize {
    10_000
}

impl Default for DurableLogConfig {
    fn default() -> Self {
        Self {
            backend: LogBackend::default(),
            redis_url: default_redis_url(),
            max_age_secs: default_max_age_secs(),
            max_messages: default_max_messages(),
        }
    }
}

/// Poll job cadences, limits and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_blocks_ms")]
    pub blocks_interval_ms: u64,
    #[serde(default = "default_pending_ms")]
    pub pending_interval_ms: u64,
    #[serde(default = "default_logs_ms")]
    pub logs_interval_ms: u64,
    #[serde(default = "default_network_ms")]
    pub network_interval_ms: u64,
    #[serde(default = "default_gas_ms")]
    pub gas_price_interval_ms: u64,
    /// Upper bound on one read cycle of any job.
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
    /// Upper bound on a single publish to the log.
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
    /// Also publish a transaction-less block payload to `eth.blocks`.
    #[serde(default)]
    pub publish_simple_blocks: bool,
    #[serde(default = "default_pending_limit")]
    pub pending_limit: usize,
    #[serde(default = "default_logs_limit")]
    pub logs_limit: usize,
    /// How many blocks behind the head the logs query starts.
    #[serde(default = "default_logs_lookback")]
    pub logs_lookback: u64,
}

fn default_blocks_ms() -> u64 {
    2_000
}

fn default_pending_ms() -> u64 {
    3_000
}

fn default_logs_ms() -> u64 {
    5_000
}

fn default_network_ms() -> u64 {
    10_000
}

fn default_gas_ms() -> u64 {
    15_000
}

fn default_upstream_timeout_ms() -> u64 {
    10_000
}

fn default_publish_timeout_ms() -> u64 {
    5_000
}

fn default_pending_limit() -> usize {
    50
}

fn default_logs_limit() -> usize {
    100
}

fn default_logs_lookback() -> u64 {
    5
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            blocks_interval_ms: default_blocks_ms(),
            pending_interval_ms: default_pending_ms(),
            logs_interval_ms: default_logs_ms(),
            network_interval_ms: default_network_ms(),
            gas_price_interval_ms: default_gas_ms(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            publish_timeout_ms: default_publish_timeout_ms(),
            publish_simple_blocks: false,
            pending_limit: default_pending_limit(),
            logs_limit: default_logs_limit(),
            logs_lookback: default_logs_lookback(),
        }
    }
}

impl PollerConfig {
    /// Polling period for `kind`.
    pub fn interval(&self, kind: StreamKind) -> Duration {
        let ms = match kind {
            StreamKind::Blocks => self.blocks_interval_ms,
            StreamKind::PendingTransactions => self.pending_interval_ms,
            StreamKind::Logs => self.logs_interval_ms,
            StreamKind::NetworkStats => self.network_interval_ms,
            StreamKind::GasPrice => self.gas_price_interval_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

/// HTTP surface and fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Reject unknown stream names with 404 instead of falling back to `blocks`.
    #[serde(default)]
    pub strict_stream_names: bool,
    /// SSE keep-alive comment interval.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Upper bound on acknowledging one relayed message.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Frames buffered between a relay and its subscriber's transport.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Tag each SSE frame with `event: <subject>`. Off by default: named
    /// events are not delivered to `EventSource.onmessage`.
    #[serde(default)]
    pub named_events: bool,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_keep_alive_secs() -> u64 {
    15
}

fn default_ack_timeout_ms() -> u64 {
    5_000
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            strict_stream_names: false,
            keep_alive_secs: default_keep_alive_secs(),
            ack_timeout_ms: default_ack_timeout_ms(),
            channel_capacity: default_channel_capacity(),
            named_events: false,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log level per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for everything without an override. Any `EnvFilter` directive
    /// is accepted, so `"info,tower_http=warn"` works too.
    #[serde(default = "default_level")]
    pub level: String,
    /// Per-crate levels keyed by crate name, e.g. `chainstream-poller: debug`.
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// One JSON object per event instead of text lines.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStreamConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub log: DurableLogConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// How long shutdown waits for poll jobs before aborting them.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

impl Default for ChainStreamConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            log: DurableLogConfig::default(),
            poller: PollerConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ChainStreamConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Reject settings that would make a job spin or publish nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in StreamKind::ALL {
            if self.poller.interval(kind).is_zero() {
                return Err(ConfigError::Invalid(format!("{kind} interval must be non-zero")));
            }
        }
        if self.poller.pending_limit == 0 || self.poller.logs_limit == 0 {
            return Err(ConfigError::Invalid("payload limits must be non-zero".into()));
        }
        if self.log.max_messages == 0 {
            return Err(ConfigError::Invalid("log.max_messages must be non-zero".into()));
        }
        if self.server.channel_capacity == 0 {
            return Err(ConfigError::Invalid("server.channel_capacity must be non-zero".into()));
        }
        if self.rpc.url.is_empty() {
            return Err(ConfigError::Invalid("rpc.url must be set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = ChainStreamConfig::from_yaml("{}").unwrap();
        assert_eq!(cfg.poller.interval(StreamKind::Blocks), Duration::from_secs(2));
        assert_eq!(cfg.poller.interval(StreamKind::GasPrice), Duration::from_secs(15));
        assert_eq!(cfg.log.max_messages, 10_000);
        assert_eq!(cfg.log.max_age_secs, 86_400);
        assert_eq!(cfg.log.backend, LogBackend::Memory);
        assert_eq!(cfg.server.port, 8080);
        assert!(!cfg.server.strict_stream_names);
    }

    #[test]
    fn partial_override() {
        let cfg = ChainStreamConfig::from_yaml(
            "poller:\n  blocks_interval_ms: 500\n\
             log:\n  backend: redis\n\
             server:\n  strict_stream_names: true\n",
        )
        .unwrap();
        assert_eq!(cfg.poller.blocks_interval_ms, 500);
        assert_eq!(cfg.poller.logs_interval_ms, 5_000);
        assert_eq!(cfg.log.backend, LogBackend::Redis);
        assert!(cfg.server.strict_stream_names);
    }

    #[test]
    fn zero_interval_rejected() {
        let err =
            ChainStreamConfig::from_yaml("poller:\n  gas_price_interval_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("gasPrice"));
    }

    #[test]
    fn backend_from_str() {
        assert_eq!("Redis".parse::<LogBackend>().unwrap(), LogBackend::Redis);
        assert!("kafka".parse::<LogBackend>().is_err());
    }
}
