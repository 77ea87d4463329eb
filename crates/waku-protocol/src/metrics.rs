//! Observability counters for the store and keep-alive components.
//!
//! Shared behind `Arc` with the code that updates them; read any time,
//! serialize to JSON for a snapshot.

use serde::Serialize;
use waku_metrics::{Counter, Gauge};

#[derive(Debug, Default, Serialize)]
pub struct StoreMetrics {
    /// `query_history` calls that passed peer selection.
    pub queries: Counter,
    pub round_trips: Counter,
    /// Non-empty pages received.
    pub pages: Counter,
    pub messages: Counter,
    /// Queries ended by a protocol or codec failure.
    pub aborted: Counter,
}

#[derive(Debug, Default, Serialize)]
pub struct KeepAliveMetrics {
    pub pings_sent: Counter,
    pub ping_failures: Counter,
    pub heartbeats_sent: Counter,
    pub heartbeat_failures: Counter,
    /// Timers currently scheduled (ping + relay, all peers).
    pub active_timers: Gauge,
}
