use crate::PeerId;

/// Errors returned by the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("peer {0} is not connected")]
    NotConnected(PeerId),

    #[error("peer {peer} does not handle {protocol}")]
    UnsupportedProtocol { peer: PeerId, protocol: String },

    #[error("failed to open {protocol} stream to {peer}: {source}")]
    StreamOpen {
        peer: PeerId,
        protocol: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("stream i/o failed: {0}")]
    Io(#[source] anyhow::Error),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("invalid peer id: {0}")]
    InvalidPeerId(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.into())
    }
}
