//! In-process network: every peer lives in one map, every stream is a
//! `tokio::io::duplex` pair whose far end is handed to the peer's
//! registered [`StreamHandler`].
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::io::DuplexStream;
use tokio::sync::{broadcast, Mutex};

use crate::connection::{BoxedStream, Connection, ConnectionEvent, Peer, PeerDirectory};
use crate::{PeerId, TransportConfig, TransportError};

/// Server side of a protocol: receives the remote half of each new stream.
#[async_trait::async_trait]
pub trait StreamHandler: Send + Sync + 'static {
    async fn handle(&self, stream: DuplexStream);
}

#[async_trait::async_trait]
impl<F, Fut> StreamHandler for F
where
    F: Fn(DuplexStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, stream: DuplexStream) {
        (self)(stream).await
    }
}

#[derive(Default)]
struct PeerEntry {
    protocols: Vec<String>,
    handlers: HashMap<String, Arc<dyn StreamHandler>>,
    connected: bool,
    refuse_streams: bool,
    streams_opened: u64,
}

impl PeerEntry {
    fn advertise(&mut self, protocol: &str) {
        if !self.protocols.iter().any(|p| p == protocol) {
            self.protocols.push(protocol.to_string());
        }
    }
}

struct Inner {
    peers: Mutex<HashMap<PeerId, PeerEntry>>,
    events: broadcast::Sender<ConnectionEvent>,
    config: TransportConfig,
}

impl Inner {
    fn emit(&self, event: ConnectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn open_stream(
        &self,
        remote: PeerId,
        protocol: &str,
    ) -> Result<DuplexStream, TransportError> {
        let handler = {
            let mut peers = self.peers.lock().await;
            let entry = peers
                .get_mut(&remote)
                .filter(|e| e.connected)
                .ok_or(TransportError::NotConnected(remote))?;

            if entry.refuse_streams {
                return Err(TransportError::StreamOpen {
                    peer: remote,
                    protocol: protocol.to_string(),
                    source: anyhow::anyhow!("stream negotiation refused"),
                });
            }

            let handler = entry.handlers.get(protocol).cloned().ok_or_else(|| {
                TransportError::UnsupportedProtocol {
                    peer: remote,
                    protocol: protocol.to_string(),
                }
            })?;
            entry.streams_opened += 1;
            handler
        };

        let (local, far) = tokio::io::duplex(self.config.stream_buffer);
        tokio::spawn(async move {
            handler.handle(far).await;
        });
        tracing::trace!(%remote, protocol, "memory stream opened");
        Ok(local)
    }
}

/// In-memory implementation of [`PeerDirectory`] and [`Connection`].
///
/// Cheap to clone; clones share the same peers.
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<Inner>,
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::new())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer);
        Self {
            inner: Arc::new(Inner {
                peers: Mutex::new(HashMap::new()),
                events,
                config,
            }),
        }
    }

    /// Register a peer (or extend its advertised protocols).
    ///
    /// Advertising a protocol does not make it servable: streams for a
    /// protocol without a [`handle`](Self::handle) registration fail with
    /// [`TransportError::UnsupportedProtocol`].
    pub async fn add_peer<I, S>(&self, id: PeerId, protocols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut peers = self.inner.peers.lock().await;
        let entry = peers.entry(id).or_default();
        for protocol in protocols {
            entry.advertise(protocol.as_ref());
        }
    }

    /// Serve `protocol` on `peer` with `handler`. Registers the peer if needed.
    pub async fn handle<H: StreamHandler>(&self, peer: PeerId, protocol: &str, handler: H) {
        let mut peers = self.inner.peers.lock().await;
        let entry = peers.entry(peer).or_default();
        entry.advertise(protocol);
        entry.handlers.insert(protocol.to_string(), Arc::new(handler));
    }

    /// Mark `peer` connected. Emits `Connected` on the transition only.
    pub async fn connect(&self, peer: PeerId) -> Result<(), TransportError> {
        let mut peers = self.inner.peers.lock().await;
        let entry = peers
            .get_mut(&peer)
            .ok_or(TransportError::UnknownPeer(peer))?;
        if !entry.connected {
            entry.connected = true;
            tracing::debug!(%peer, "memory peer connected");
            self.inner.emit(ConnectionEvent::Connected(peer));
        }
        Ok(())
    }

    /// Mark `peer` disconnected. Emits `Disconnected` on the transition only.
    pub async fn disconnect(&self, peer: PeerId) {
        let mut peers = self.inner.peers.lock().await;
        if let Some(entry) = peers.get_mut(&peer) {
            if entry.connected {
                entry.connected = false;
                tracing::debug!(%peer, "memory peer disconnected");
                self.inner.emit(ConnectionEvent::Disconnected(peer));
            }
        }
    }

    /// Forget `peer` entirely, disconnecting it first.
    pub async fn remove_peer(&self, peer: PeerId) {
        let mut peers = self.inner.peers.lock().await;
        if let Some(entry) = peers.remove(&peer) {
            if entry.connected {
                self.inner.emit(ConnectionEvent::Disconnected(peer));
            }
        }
    }

    /// Make every stream negotiation with `peer` fail (or succeed again).
    pub async fn refuse_streams(&self, peer: PeerId, refuse: bool) {
        if let Some(entry) = self.inner.peers.lock().await.get_mut(&peer) {
            entry.refuse_streams = refuse;
        }
    }

    /// Number of streams successfully opened to `peer`.
    pub async fn streams_opened(&self, peer: PeerId) -> u64 {
        self.inner
            .peers
            .lock()
            .await
            .get(&peer)
            .map_or(0, |e| e.streams_opened)
    }

    /// Total streams opened across all peers.
    pub async fn total_streams_opened(&self) -> u64 {
        self.inner
            .peers
            .lock()
            .await
            .values()
            .map(|e| e.streams_opened)
            .sum()
    }
}

#[async_trait::async_trait]
impl PeerDirectory for MemoryNetwork {
    async fn peer(&self, id: &PeerId) -> Option<Peer> {
        let peers = self.inner.peers.lock().await;
        peers
            .get(id)
            .map(|entry| Peer::new(*id, entry.protocols.clone()))
    }

    async fn peers_for_protocol(&self, protocol: &str) -> Vec<Peer> {
        let peers = self.inner.peers.lock().await;
        let mut found: Vec<Peer> = peers
            .iter()
            .filter(|(_, entry)| entry.protocols.iter().any(|p| p == protocol))
            .map(|(id, entry)| Peer::new(*id, entry.protocols.clone()))
            .collect();
        found.sort_by_key(|p| p.id);
        found
    }

    async fn connection(&self, id: &PeerId) -> Option<Arc<dyn Connection>> {
        let peers = self.inner.peers.lock().await;
        match peers.get(id) {
            Some(entry) if entry.connected => {
                let conn: Arc<dyn Connection> = Arc::new(MemoryConnection {
                    remote: *id,
                    inner: self.inner.clone(),
                });
                Some(conn)
            }
            _ => None,
        }
    }

    async fn connected_peers(&self) -> Vec<PeerId> {
        let peers = self.inner.peers.lock().await;
        let mut connected: Vec<PeerId> = peers
            .iter()
            .filter(|(_, entry)| entry.connected)
            .map(|(id, _)| *id)
            .collect();
        connected.sort();
        connected
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }
}

/// Connection handle returned by [`MemoryNetwork`].
pub struct MemoryConnection {
    remote: PeerId,
    inner: Arc<Inner>,
}

#[async_trait::async_trait]
impl Connection for MemoryConnection {
    fn remote_peer(&self) -> PeerId {
        self.remote
    }

    async fn open_stream(&self, protocol: &str) -> Result<BoxedStream, TransportError> {
        let stream = self.inner.open_stream(self.remote, protocol).await?;
        Ok(Box::new(stream))
    }
}
