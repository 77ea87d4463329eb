use std::time::{SystemTime, UNIX_EPOCH};

pub use waku_transport::PeerId;

/// Store (history query) protocol identifier.
pub const STORE_CODEC: &str = "/vac/waku/store/2.0.0-beta3";

/// Relay protocol identifier.
pub const RELAY_CODEC: &str = "/vac/waku/relay/2.0.0-beta2";

/// Relay protocol ids accepted from remote peers, preferred first.
pub const RELAY_CODECS: [&str; 2] = [RELAY_CODEC, "/vac/waku/relay/2.0.0"];

/// Light push protocol identifier.
pub const LIGHT_PUSH_CODEC: &str = "/vac/waku/lightpush/2.0.0-beta1";

/// Default pubsub topic shared by relay, light push and store.
pub const DEFAULT_PUBSUB_TOPIC: &str = "/waku/2/default-waku/proto";

/// Content topic of relay keep-alive heartbeats (empty payload).
pub const RELAY_PING_CONTENT_TOPIC: &str = "/relay-ping/1/ping/null";

/// Default number of messages requested per history page.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Default liveness ping period in seconds (0 = disabled).
pub const DEFAULT_PING_KEEP_ALIVE_SECS: u64 = 0;

/// Default relay heartbeat period in seconds.
pub const DEFAULT_RELAY_KEEP_ALIVE_SECS: u64 = 5 * 60;

/// Current time as fractional seconds since UNIX epoch.
#[inline]
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
