use waku_transport::{PeerId, TransportError};

/// Errors surfaced by the Waku client core.
///
/// `PeerSelection`, `Connection` and `InvalidQuery` are raised before any
/// network activity. `Protocol` and `Codec` describe a failed round trip;
/// during a history query they end the query instead of propagating.
#[derive(Debug, thiserror::Error)]
pub enum WakuError {
    #[error("peer selection failed: {0}")]
    PeerSelection(String),

    #[error("failed to get a connection to peer {peer}")]
    Connection { peer: PeerId },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("store {stage} failed: {source}")]
    Protocol {
        stage: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("relay publish failed: {0}")]
    Publish(String),

    #[error("node shut down")]
    Shutdown,
}

/// Coarse classification of a [`WakuError`], cheap to copy into results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PeerSelection,
    Connection,
    InvalidQuery,
    Protocol,
    Codec,
    Publish,
    Shutdown,
}

impl WakuError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WakuError::PeerSelection(_) => ErrorKind::PeerSelection,
            WakuError::Connection { .. } => ErrorKind::Connection,
            WakuError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            WakuError::Protocol { .. } => ErrorKind::Protocol,
            WakuError::Codec(_) => ErrorKind::Codec,
            WakuError::Publish(_) => ErrorKind::Publish,
            WakuError::Shutdown => ErrorKind::Shutdown,
        }
    }
}

impl From<rmp_serde::encode::Error> for WakuError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        WakuError::Codec(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for WakuError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        WakuError::Codec(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_peer_selection() {
        let err = WakuError::PeerSelection("no peer available".into());
        assert_eq!(err.to_string(), "peer selection failed: no peer available");
    }

    #[test]
    fn test_display_connection() {
        let peer = PeerId::from_bytes([0x11; 32]);
        let err = WakuError::Connection { peer };
        assert_eq!(
            err.to_string(),
            format!("failed to get a connection to peer {peer}")
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(WakuError::Codec("x".into()).kind(), ErrorKind::Codec);
        let err = WakuError::Protocol {
            stage: "read",
            source: TransportError::FrameTooLarge { size: 9, max: 1 },
        };
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(WakuError::Shutdown.kind(), ErrorKind::Shutdown);
    }

    #[test]
    fn test_decode_error_is_codec() {
        let err: WakuError = rmp_serde::from_slice::<u32>(&[0xc1])
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Codec);
    }

    #[test]
    fn test_protocol_error_keeps_transport_source() {
        let peer = PeerId::from_bytes([0x22; 32]);
        let err = WakuError::Protocol {
            stage: "stream negotiation",
            source: TransportError::NotConnected(peer),
        };
        assert!(err.to_string().starts_with("store stream negotiation failed: "));

        let source = std::error::Error::source(&err).expect("source kept");
        let transport = source
            .downcast_ref::<TransportError>()
            .expect("source is a TransportError");
        assert!(matches!(transport, TransportError::NotConnected(p) if *p == peer));
    }
}
