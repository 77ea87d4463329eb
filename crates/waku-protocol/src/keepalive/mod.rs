//! Per-peer keep-alive timers.
//!
//! Two independent repeating timers per connected peer: a liveness ping
//! and a relay heartbeat (empty message on [`RELAY_PING_CONTENT_TOPIC`]).
//! The registry maps each peer to at most one of each; `start` always goes
//! through `stop` first so reconnects replace timers instead of stacking them.

mod service;

pub use service::{KeepAliveCommand, KeepAliveHandle, KeepAlivePeriods, KeepAliveService};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::WakuError;
use crate::message::WakuMessage;
use crate::metrics::KeepAliveMetrics;
use crate::types::{PeerId, RELAY_PING_CONTENT_TOPIC};

/// Sends a liveness probe to a peer. Result is informational only.
#[async_trait::async_trait]
pub trait LivenessProbe: Send + Sync + 'static {
    /// Returns the measured round-trip time.
    async fn ping(&self, peer: PeerId) -> Result<Duration, WakuError>;
}

/// Publishes a message on the relay channel.
#[async_trait::async_trait]
pub trait RelayPublisher: Send + Sync + 'static {
    async fn publish(&self, message: WakuMessage) -> Result<(), WakuError>;
}

/// Timers owned for one peer.
#[derive(Debug, Default)]
pub struct KeepAliveEntry {
    ping: Option<JoinHandle<()>>,
    relay: Option<JoinHandle<()>>,
}

impl KeepAliveEntry {
    pub fn has_ping(&self) -> bool {
        self.ping.is_some()
    }

    pub fn has_relay(&self) -> bool {
        self.relay.is_some()
    }

    pub fn timer_count(&self) -> usize {
        self.ping.is_some() as usize + self.relay.is_some() as usize
    }

    /// Abort both timers. Returns how many were running.
    fn cancel(self) -> usize {
        let mut cancelled = 0;
        for handle in [self.ping, self.relay].into_iter().flatten() {
            handle.abort();
            cancelled += 1;
        }
        cancelled
    }
}

/// Registry of keep-alive timers, one [`KeepAliveEntry`] per peer.
///
/// Single owner: mutate only from one task (see [`KeepAliveService`]).
pub struct KeepAliveManager {
    prober: Arc<dyn LivenessProbe>,
    relay: Arc<dyn RelayPublisher>,
    entries: HashMap<PeerId, KeepAliveEntry>,
    metrics: Arc<KeepAliveMetrics>,
}

impl KeepAliveManager {
    pub fn new(prober: Arc<dyn LivenessProbe>, relay: Arc<dyn RelayPublisher>) -> Self {
        Self {
            prober,
            relay,
            entries: HashMap::new(),
            metrics: Arc::new(KeepAliveMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<KeepAliveMetrics> {
        self.metrics.clone()
    }

    /// (Re)start keep-alive for `peer`. A zero period disables that timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, peer: PeerId, ping_period: Duration, relay_period: Duration) {
        self.stop(&peer);

        let mut entry = KeepAliveEntry::default();
        if !ping_period.is_zero() {
            entry.ping = Some(spawn_ping_timer(
                self.prober.clone(),
                self.metrics.clone(),
                peer,
                ping_period,
            ));
        }
        if !relay_period.is_zero() {
            entry.relay = Some(spawn_relay_timer(
                self.relay.clone(),
                self.metrics.clone(),
                peer,
                relay_period,
            ));
        }

        let timers = entry.timer_count();
        if timers == 0 {
            return;
        }
        for _ in 0..timers {
            self.metrics.active_timers.inc();
        }
        tracing::debug!(%peer, ?ping_period, ?relay_period, "keep-alive started");
        self.entries.insert(peer, entry);
    }

    /// Cancel both timers for `peer`. Returns whether anything was running.
    pub fn stop(&mut self, peer: &PeerId) -> bool {
        let Some(entry) = self.entries.remove(peer) else {
            return false;
        };
        for _ in 0..entry.cancel() {
            self.metrics.active_timers.dec();
        }
        tracing::debug!(%peer, "keep-alive stopped");
        true
    }

    /// Cancel every timer.
    pub fn stop_all(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.cancel();
        }
        self.metrics.active_timers.set(0);
    }

    pub fn is_active(&self, peer: &PeerId) -> bool {
        self.entries.contains_key(peer)
    }

    pub fn entry(&self, peer: &PeerId) -> Option<&KeepAliveEntry> {
        self.entries.get(peer)
    }

    pub fn active_peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.entries.keys().copied().collect();
        peers.sort();
        peers
    }

    /// Timers currently registered, all peers.
    pub fn timer_count(&self) -> usize {
        self.entries.values().map(KeepAliveEntry::timer_count).sum()
    }
}

impl Drop for KeepAliveManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Repeating interval whose first tick is one full period from now.
fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn spawn_ping_timer(
    prober: Arc<dyn LivenessProbe>,
    metrics: Arc<KeepAliveMetrics>,
    peer: PeerId,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = ticker(period);
        loop {
            interval.tick().await;
            match prober.ping(peer).await {
                Ok(rtt) => {
                    metrics.pings_sent.inc();
                    tracing::trace!(%peer, ?rtt, "keep-alive ping");
                }
                Err(e) => {
                    metrics.ping_failures.inc();
                    tracing::debug!(%peer, "keep-alive ping failed: {e}");
                }
            }
        }
    })
}

fn spawn_relay_timer(
    relay: Arc<dyn RelayPublisher>,
    metrics: Arc<KeepAliveMetrics>,
    peer: PeerId,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = ticker(period);
        loop {
            interval.tick().await;
            let heartbeat = WakuMessage::new(Vec::new(), RELAY_PING_CONTENT_TOPIC);
            match relay.publish(heartbeat).await {
                Ok(()) => {
                    metrics.heartbeats_sent.inc();
                    tracing::trace!(%peer, "relay heartbeat sent");
                }
                Err(e) => {
                    metrics.heartbeat_failures.inc();
                    tracing::debug!(%peer, "relay heartbeat failed: {e}");
                }
            }
        }
    })
}

// ── Test doubles ────────────────────────────────────────────────────
