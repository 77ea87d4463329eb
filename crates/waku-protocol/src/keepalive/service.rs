use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use waku_transport::{ConnectionEvent, PeerDirectory};

use super::KeepAliveManager;
use crate::config::WakuConfig;
use crate::error::WakuError;
use crate::types::PeerId;

// ── Configuration ─────────────────────────────────────────────────────

/// Periods applied to every peer that connects. Zero disables a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlivePeriods {
    pub ping: Duration,
    pub relay: Duration,
}

impl KeepAlivePeriods {
    pub fn from_config(config: &WakuConfig) -> Self {
        Self {
            ping: config.ping_keep_alive_period(),
            relay: config.relay_keep_alive_period(),
        }
    }
}

// ── Commands (handle → driver) ────────────────────────────────────────

pub enum KeepAliveCommand {
    /// Start (or restart) timers for a peer with explicit periods.
    Start {
        peer: PeerId,
        ping: Duration,
        relay: Duration,
    },
    /// Cancel timers for a peer.
    Stop { peer: PeerId },
    /// Query: peers with at least one timer.
    ActivePeers { reply: oneshot::Sender<Vec<PeerId>> },
    /// Query: timers registered across all peers.
    TimerCount { reply: oneshot::Sender<usize> },
    /// Cancel everything and exit the driver.
    Shutdown { done: oneshot::Sender<()> },
}

// ── KeepAliveHandle ──────────────────────────────────────────────────

/// Handle to a running keep-alive driver.
///
/// Cheap to clone. Once the driver has exited, commands fail with
/// [`WakuError::Shutdown`] and queries return empty results.
#[derive(Clone)]
pub struct KeepAliveHandle {
    cmd_tx: mpsc::Sender<KeepAliveCommand>,
}

impl KeepAliveHandle {
    pub async fn start(
        &self,
        peer: PeerId,
        ping: Duration,
        relay: Duration,
    ) -> Result<(), WakuError> {
        self.cmd_tx
            .send(KeepAliveCommand::Start { peer, ping, relay })
            .await
            .map_err(|_| WakuError::Shutdown)
    }

    pub async fn stop(&self, peer: PeerId) -> Result<(), WakuError> {
        self.cmd_tx
            .send(KeepAliveCommand::Stop { peer })
            .await
            .map_err(|_| WakuError::Shutdown)
    }

    pub async fn active_peers(&self) -> Vec<PeerId> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(KeepAliveCommand::ActivePeers { reply: tx })
            .await;
        rx.await.unwrap_or_default()
    }

    pub async fn timer_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(KeepAliveCommand::TimerCount { reply: tx })
            .await;
        rx.await.unwrap_or_default()
    }

    /// Stop every timer and wait for the driver to exit. Idempotent.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(KeepAliveCommand::Shutdown { done: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

// ── Driver ───────────────────────────────────────────────────────────

/// Task that owns a [`KeepAliveManager`] and feeds it lifecycle events.
pub struct KeepAliveService;

impl KeepAliveService {
    /// Spawn the driver on `directory`'s lifecycle events. Connected peers
    /// get `periods`; disconnected peers are stopped. Returns the command
    /// handle and the task handle.
    ///
    /// If the driver falls behind the event stream, the registry is
    /// re-synced with `directory.connected_peers()`: stale peers are
    /// stopped and connected peers without timers are started.
    pub fn spawn(
        manager: KeepAliveManager,
        directory: Arc<dyn PeerDirectory>,
        periods: KeepAlivePeriods,
        command_buffer: usize,
    ) -> (KeepAliveHandle, JoinHandle<()>) {
        let events = directory.subscribe();
        let (cmd_tx, cmd_rx) = mpsc::channel(command_buffer.max(1));
        let task = tokio::spawn(driver_loop(manager, directory, events, cmd_rx, periods));
        (KeepAliveHandle { cmd_tx }, task)
    }
}

/// Bring the registry in line with the directory after missed events.
async fn reconcile(
    manager: &mut KeepAliveManager,
    directory: &dyn PeerDirectory,
    periods: KeepAlivePeriods,
) {
    let connected = directory.connected_peers().await;

    let mut stopped = 0usize;
    for peer in manager.active_peers() {
        if !connected.contains(&peer) {
            manager.stop(&peer);
            stopped += 1;
        }
    }

    let mut started = 0usize;
    for peer in connected {
        if !manager.is_active(&peer) {
            manager.start(peer, periods.ping, periods.relay);
            started += 1;
        }
    }
    tracing::debug!(stopped, started, "keep-alive registry re-synced");
}

async fn driver_loop(
    mut manager: KeepAliveManager,
    directory: Arc<dyn PeerDirectory>,
    mut events: broadcast::Receiver<ConnectionEvent>,
    mut cmd_rx: mpsc::Receiver<KeepAliveCommand>,
    periods: KeepAlivePeriods,
) {
    tracing::debug!(?periods, "keep-alive driver started");
    let mut done: Option<oneshot::Sender<()>> = None;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ConnectionEvent::Connected(peer)) => {
                    manager.start(peer, periods.ping, periods.relay);
                }
                Ok(ConnectionEvent::Disconnected(peer)) => {
                    manager.stop(&peer);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "keep-alive driver lagged behind connection events");
                    reconcile(&mut manager, directory.as_ref(), periods).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("connection events closed, stopping keep-alive driver");
                    break;
                }
            },

            cmd = cmd_rx.recv() => match cmd {
                Some(KeepAliveCommand::Start { peer, ping, relay }) => {
                    manager.start(peer, ping, relay);
                }
                Some(KeepAliveCommand::Stop { peer }) => {
                    manager.stop(&peer);
                }
                Some(KeepAliveCommand::ActivePeers { reply }) => {
                    let _ = reply.send(manager.active_peers());
                }
                Some(KeepAliveCommand::TimerCount { reply }) => {
                    let _ = reply.send(manager.timer_count());
                }
                Some(KeepAliveCommand::Shutdown { done: tx }) => {
                    done = Some(tx);
                    break;
                }
                // Every handle dropped.
                None => break,
            },
        }
    }

    manager.stop_all();
    tracing::debug!("keep-alive driver stopped");
    if let Some(tx) = done {
        let _ = tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keepalive::mock::{MockProbe, MockRelay};
    use waku_transport::{MemoryNetwork, TransportConfig};

    const SEC: Duration = Duration::from_secs(1);

    fn spawn_driver(
        net: &MemoryNetwork,
        periods: KeepAlivePeriods,
    ) -> (KeepAliveHandle, JoinHandle<()>, Arc<MockProbe>) {
        let probe = Arc::new(MockProbe::default());
        let relay = Arc::new(MockRelay::default());
        let manager = KeepAliveManager::new(probe.clone(), relay);
        let (handle, task) = KeepAliveService::spawn(manager, Arc::new(net.clone()), periods, 8);
        (handle, task, probe)
    }

    fn periods(ping: u64, relay: u64) -> KeepAlivePeriods {
        KeepAlivePeriods {
            ping: Duration::from_secs(ping),
            relay: Duration::from_secs(relay),
        }
    }

    async fn known_peer(net: &MemoryNetwork) -> PeerId {
        let peer = PeerId::random();
        net.add_peer(peer, ["/vac/waku/relay/2.0.0-beta2"]).await;
        peer
    }

    #[tokio::test(start_paused = true)]
    async fn connect_and_disconnect_drive_timers() {
        let net = MemoryNetwork::new();
        let (handle, _task, probe) = spawn_driver(&net, periods(10, 0));
        let peer = known_peer(&net).await;

        net.connect(peer).await.unwrap();
        tokio::time::sleep(25 * SEC).await;
        assert_eq!(handle.active_peers().await, vec![peer]);
        assert_eq!(probe.count_for(&peer), 2);

        net.disconnect(peer).await;
        tokio::time::sleep(50 * SEC).await;
        assert!(handle.active_peers().await.is_empty());
        assert_eq!(probe.count_for(&peer), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_churn_keeps_one_timer_pair() {
        let net = MemoryNetwork::new();
        let (handle, _task, _probe) = spawn_driver(&net, periods(10, 300));
        let peer = known_peer(&net).await;

        for _ in 0..5 {
            net.connect(peer).await.unwrap();
            net.disconnect(peer).await;
        }
        net.connect(peer).await.unwrap();
        tokio::time::sleep(SEC).await;
        assert_eq!(handle.timer_count().await, 2);
    }

    /// Disconnect of `a` is lost in a lag; the driver must still drop its timers.
    #[tokio::test(start_paused = true)]
    async fn lagged_events_are_reconciled() {
        let net = MemoryNetwork::with_config(TransportConfig::new().event_buffer(1));
        let (handle, _task, probe) = spawn_driver(&net, periods(5, 0));
        let a = known_peer(&net).await;
        let b = known_peer(&net).await;

        net.connect(a).await.unwrap();
        tokio::time::sleep(SEC).await;
        assert_eq!(handle.active_peers().await, vec![a]);

        // Two events into a one-slot channel without yielding: the driver lags.
        net.disconnect(a).await;
        net.connect(b).await.unwrap();
        tokio::time::sleep(SEC).await;

        assert_eq!(handle.active_peers().await, vec![b]);
        let a_pings = probe.count_for(&a);
        tokio::time::sleep(60 * SEC).await;
        assert_eq!(probe.count_for(&a), a_pings);
        assert!(probe.count_for(&b) >= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_commands() {
        let net = MemoryNetwork::new();
        let (handle, _task, probe) = spawn_driver(&net, periods(0, 0));
        let peer = PeerId::random();

        handle.start(peer, 5 * SEC, Duration::ZERO).await.unwrap();
        tokio::time::sleep(11 * SEC).await;
        assert_eq!(probe.count_for(&peer), 2);

        handle.stop(peer).await.unwrap();
        assert_eq!(handle.timer_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_and_closes() {
        let net = MemoryNetwork::new();
        let (handle, task, probe) = spawn_driver(&net, periods(5, 0));
        let peer = known_peer(&net).await;
        net.connect(peer).await.unwrap();
        tokio::time::sleep(SEC).await;

        handle.shutdown().await;
        task.await.unwrap();
        assert!(handle.is_closed());
        assert!(matches!(handle.stop(peer).await, Err(WakuError::Shutdown)));
        assert!(handle.active_peers().await.is_empty());

        tokio::time::sleep(60 * SEC).await;
        assert_eq!(probe.count_for(&peer), 0);

        // Second shutdown is a no-op.
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_driver() {
        let net = MemoryNetwork::new();
        let (handle, task, probe) = spawn_driver(&net, periods(5, 0));
        let peer = known_peer(&net).await;
        net.connect(peer).await.unwrap();
        tokio::time::sleep(SEC).await;

        drop(handle);
        task.await.unwrap();

        tokio::time::sleep(60 * SEC).await;
        assert_eq!(probe.count_for(&peer), 0);
    }
}
