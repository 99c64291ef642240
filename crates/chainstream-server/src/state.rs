//! Shared handler state.

use std::sync::Arc;
use std::time::Duration;

use chainstream_core::config::ServerConfig;
use chainstream_log::Retention;

use crate::bridge::FanoutBridge;

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<FanoutBridge>,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
    /// Frames buffered per subscriber before its relay waits.
    pub channel_capacity: usize,
    /// Reported by the directory endpoint.
    pub retention: Retention,
    /// Add `event: <subject>` to every frame.
    pub named_events: bool,
}

impl AppState {
    pub fn new(bridge: FanoutBridge, config: &ServerConfig, retention: Retention) -> Self {
        Self {
            bridge: Arc::new(bridge),
            keep_alive: Duration::from_secs(config.keep_alive_secs.max(1)),
            channel_capacity: config.channel_capacity.max(1),
            retention,
            named_events: config.named_events,
        }
    }
}
