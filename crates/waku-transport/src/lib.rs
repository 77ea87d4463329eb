//! Waku client transport boundary.
//!
//! The protocol layer never talks to a concrete transport. It sees peers
//! through [`PeerDirectory`], opens one protocol stream per request through
//! [`Connection`], and learns about connects/disconnects through a
//! [`ConnectionEvent`] subscription. Frames on those streams are
//! length-prefixed (see [`write_framed`] / [`read_framed`]).
//!
//! [`MemoryNetwork`] implements the whole boundary in-process on top of
//! `tokio::io::duplex`, which is what the protocol tests run against.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use waku_transport::{read_framed, write_framed, MemoryNetwork, PeerDirectory, PeerId};
//!
//! # async fn example() -> Result<(), waku_transport::TransportError> {
//! let net = MemoryNetwork::new();
//! let server = PeerId::random();
//! net.handle(server, "/echo/1.0.0", |mut stream: tokio::io::DuplexStream| async move {
//!     if let Ok(data) = read_framed(&mut stream, 1024).await {
//!         let _ = write_framed(&mut stream, &data).await;
//!     }
//! })
//! .await;
//! net.connect(server).await?;
//!
//! let conn = net.connection(&server).await.expect("connected");
//! let mut stream = conn.open_stream("/echo/1.0.0").await?;
//! write_framed(&mut stream, b"hello").await?;
//! assert_eq!(read_framed(&mut stream, 1024).await?, b"hello");
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod error;
mod memory;
mod protocol;

pub use config::TransportConfig;
pub use connection::{BoxedStream, Connection, ConnectionEvent, Peer, PeerDirectory, ProtocolStream};
pub use error::TransportError;
pub use memory::{MemoryConnection, MemoryNetwork, StreamHandler};
pub use protocol::{read_framed, write_framed, DEFAULT_MAX_MESSAGE_SIZE};

use std::fmt;
use std::str::FromStr;

/// Network identity of a peer: 32 opaque bytes.
///
/// Displayed and parsed as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId([u8; 32]);

impl PeerId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fresh random identity (tests, ephemeral nodes).
    pub fn random() -> Self {
        use rand::Rng;
        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.0);
        write!(f, "PeerId({}...)", &hex[..12])
    }
}

impl FromStr for PeerId {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| TransportError::InvalidPeerId(s.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TransportError::InvalidPeerId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl serde::Serialize for PeerId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for PeerId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
