use std::time::Duration;

use waku_transport::DEFAULT_MAX_MESSAGE_SIZE;

use crate::types::{
    DEFAULT_PING_KEEP_ALIVE_SECS, DEFAULT_PUBSUB_TOPIC, DEFAULT_RELAY_KEEP_ALIVE_SECS,
};

/// Configuration for a [`WakuNode`](crate::WakuNode) and its components.
///
/// ```rust
/// use std::time::Duration;
/// use waku_protocol::WakuConfig;
///
/// let config = WakuConfig::new()
///     .ping_keep_alive(Duration::from_secs(10))
///     .relay_keep_alive(Duration::ZERO);
/// assert!(config.relay_keep_alive_period().is_zero());
/// ```
#[derive(Debug, Clone)]
pub struct WakuConfig {
    /// Pubsub topic used by default for store queries.
    pub(crate) pubsub_topic: String,
    /// Liveness ping period per connected peer. Zero disables.
    pub(crate) ping_keep_alive: Duration,
    /// Relay heartbeat period per connected peer. Zero disables.
    pub(crate) relay_keep_alive: Duration,
    /// Largest store response frame accepted.
    pub(crate) max_message_size: usize,
    /// Keep-alive command channel capacity.
    pub(crate) command_buffer: usize,
}

impl Default for WakuConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WakuConfig {
    /// Defaults: ping disabled, relay heartbeat every 5 minutes.
    ///
    /// `WAKU_PUBSUB_TOPIC`, when set and non-empty, replaces the default
    /// pubsub topic. [`.pubsub_topic()`](Self::pubsub_topic) overrides it.
    pub fn new() -> Self {
        let pubsub_topic = std::env::var("WAKU_PUBSUB_TOPIC")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PUBSUB_TOPIC.to_string());

        Self {
            pubsub_topic,
            ping_keep_alive: Duration::from_secs(DEFAULT_PING_KEEP_ALIVE_SECS),
            relay_keep_alive: Duration::from_secs(DEFAULT_RELAY_KEEP_ALIVE_SECS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            command_buffer: 64,
        }
    }

    pub fn pubsub_topic(mut self, topic: impl Into<String>) -> Self {
        self.pubsub_topic = topic.into();
        self
    }

    pub fn ping_keep_alive(mut self, period: Duration) -> Self {
        self.ping_keep_alive = period;
        self
    }

    pub fn relay_keep_alive(mut self, period: Duration) -> Self {
        self.relay_keep_alive = period;
        self
    }

    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity.max(1);
        self
    }

    pub fn default_pubsub_topic(&self) -> &str {
        &self.pubsub_topic
    }

    pub fn ping_keep_alive_period(&self) -> Duration {
        self.ping_keep_alive
    }

    pub fn relay_keep_alive_period(&self) -> Duration {
        self.relay_keep_alive
    }
}
