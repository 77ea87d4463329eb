use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;

use crate::{PeerId, TransportError};

/// A bidirectional protocol stream.
pub trait ProtocolStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ProtocolStream for T {}

pub type BoxedStream = Box<dyn ProtocolStream>;

/// A known peer and the protocols it advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: PeerId,
    pub protocols: Vec<String>,
}

impl Peer {
    pub fn new(id: PeerId, protocols: Vec<String>) -> Self {
        Self { id, protocols }
    }

    /// Whether this peer advertises `protocol`.
    pub fn supports(&self, protocol: &str) -> bool {
        self.protocols.iter().any(|p| p == protocol)
    }
}

/// Connection lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected(PeerId),
    Disconnected(PeerId),
}

impl ConnectionEvent {
    pub fn peer(&self) -> PeerId {
        match self {
            ConnectionEvent::Connected(peer) | ConnectionEvent::Disconnected(peer) => *peer,
        }
    }
}

/// An established connection able to open protocol streams.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    fn remote_peer(&self) -> PeerId;

    /// Negotiate a fresh stream for `protocol`.
    async fn open_stream(&self, protocol: &str) -> Result<BoxedStream, TransportError>;
}

/// Peer lookup, connections, and lifecycle subscription.
///
/// Production: backed by the node's peer store and connection manager.
/// Tests: [`MemoryNetwork`](crate::MemoryNetwork).
#[async_trait::async_trait]
pub trait PeerDirectory: Send + Sync {
    /// Look up a peer by id.
    async fn peer(&self, id: &PeerId) -> Option<Peer>;

    /// All known peers advertising `protocol`.
    async fn peers_for_protocol(&self, protocol: &str) -> Vec<Peer>;

    /// Current connection to `id`, if any.
    async fn connection(&self, id: &PeerId) -> Option<Arc<dyn Connection>>;

    /// Ids of every currently connected peer.
    async fn connected_peers(&self) -> Vec<PeerId>;

    /// Subscribe to connect/disconnect events.
    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent>;
}
