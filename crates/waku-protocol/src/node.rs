//! WakuNode: the store client and the keep-alive driver over one directory.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use waku_transport::PeerDirectory;

use crate::config::WakuConfig;
use crate::error::WakuError;
use crate::keepalive::{
    KeepAliveHandle, KeepAliveManager, KeepAlivePeriods, KeepAliveService, LivenessProbe,
    RelayPublisher,
};
use crate::metrics::KeepAliveMetrics;
use crate::store::{QueryOptions, QueryOutcome, WakuStore};
use crate::types::{LIGHT_PUSH_CODEC, RELAY_CODECS, STORE_CODEC};

/// Protocol groups awaited by [`WakuNode::wait_for_connected_peer`] when
/// none are given. Any id within a group satisfies it.
pub const DEFAULT_DESIRED_PROTOCOLS: [&[&str]; 3] =
    [&[STORE_CODEC], &[LIGHT_PUSH_CODEC], &RELAY_CODECS];

pub struct WakuNode {
    directory: Arc<dyn PeerDirectory>,
    store: WakuStore,
    keep_alive: KeepAliveHandle,
    keep_alive_metrics: Arc<KeepAliveMetrics>,
    driver: Mutex<Option<JoinHandle<()>>>,
    config: WakuConfig,
}

impl WakuNode {
    /// Build the store client and spawn the keep-alive driver.
    ///
    /// Peers that connect after this call get keep-alive timers with the
    /// configured periods. Must be called from within a tokio runtime.
    pub fn new(
        directory: Arc<dyn PeerDirectory>,
        prober: Arc<dyn LivenessProbe>,
        relay: Arc<dyn RelayPublisher>,
        config: WakuConfig,
    ) -> Self {
        let store = WakuStore::new(directory.clone(), &config);

        let manager = KeepAliveManager::new(prober, relay);
        let keep_alive_metrics = manager.metrics();
        let (keep_alive, driver) = KeepAliveService::spawn(
            manager,
            directory.clone(),
            KeepAlivePeriods::from_config(&config),
            config.command_buffer,
        );

        tracing::info!(
            pubsub_topic = %config.default_pubsub_topic(),
            ping = ?config.ping_keep_alive_period(),
            relay = ?config.relay_keep_alive_period(),
            "waku node started"
        );

        Self {
            directory,
            store,
            keep_alive,
            keep_alive_metrics,
            driver: Mutex::new(Some(driver)),
            config,
        }
    }

    pub fn store(&self) -> &WakuStore {
        &self.store
    }

    pub fn keep_alive(&self) -> &KeepAliveHandle {
        &self.keep_alive
    }

    pub fn keep_alive_metrics(&self) -> &KeepAliveMetrics {
        &self.keep_alive_metrics
    }

    pub fn config(&self) -> &WakuConfig {
        &self.config
    }

    /// Shorthand for `self.store().query_history(options)`.
    pub async fn query_history(&self, options: QueryOptions) -> Result<QueryOutcome, WakuError> {
        self.store.query_history(options).await
    }

    /// Resolve once every group in `groups` has at least one connected
    /// peer advertising one of its protocol ids (a group lists accepted
    /// versions of one protocol). Empty = [`DEFAULT_DESIRED_PROTOCOLS`].
    ///
    /// Fails with [`WakuError::Shutdown`] if the directory stops emitting
    /// lifecycle events first.
    pub async fn wait_for_connected_peer(&self, groups: &[&[&str]]) -> Result<(), WakuError> {
        let groups: &[&[&str]] = if groups.is_empty() {
            &DEFAULT_DESIRED_PROTOCOLS
        } else {
            groups
        };

        // Subscribe before the first check so no connect slips in between.
        let mut events = self.directory.subscribe();
        loop {
            if self.all_served(groups).await {
                return Ok(());
            }
            match events.recv().await {
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "wait_for_connected_peer lagged, re-checking");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(WakuError::Shutdown),
            }
        }
    }

    async fn all_served(&self, groups: &[&[&str]]) -> bool {
        for group in groups {
            let mut served = false;
            for protocol in group.iter() {
                if self.has_connected_peer(protocol).await {
                    served = true;
                    break;
                }
            }
            if !served {
                return false;
            }
        }
        true
    }

    async fn has_connected_peer(&self, protocol: &str) -> bool {
        for peer in self.directory.peers_for_protocol(protocol).await {
            if self.directory.connection(&peer.id).await.is_some() {
                return true;
            }
        }
        false
    }

    /// Stop every keep-alive timer and the driver task. Idempotent.
    pub async fn shutdown(&self) {
        self.keep_alive.shutdown().await;
        if let Some(driver) = self.driver.lock().await.take() {
            if let Err(e) = driver.await {
                tracing::warn!("keep-alive driver ended abnormally: {e}");
            }
        }
        tracing::info!("waku node stopped");
    }
}
