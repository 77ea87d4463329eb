/// Configuration for a [`MemoryNetwork`](crate::MemoryNetwork).
///
/// Builder style, every field has a default:
///
/// ```rust
/// use waku_transport::TransportConfig;
///
/// let config = TransportConfig::new()
///     .event_buffer(128)
///     .stream_buffer(16 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Capacity of the connection lifecycle broadcast channel.
    pub(crate) event_buffer: usize,
    /// In-flight byte capacity of each in-memory stream.
    pub(crate) stream_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self {
            event_buffer: 64,
            stream_buffer: 64 * 1024,
        }
    }

    /// Set the lifecycle event channel capacity (default: 64).
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// Set the per-stream buffer size in bytes (default: 64 KB).
    pub fn stream_buffer(mut self, bytes: usize) -> Self {
        self.stream_buffer = bytes.max(1);
        self
    }
}
