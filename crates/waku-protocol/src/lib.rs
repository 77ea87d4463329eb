//! Waku client core.
//!
//! Two stateful pieces on top of `waku-transport`:
//!
//! - [`WakuStore`] retrieves history from a store peer, one page per round
//!   trip, following the cursor until a short page, an empty page or a
//!   missing cursor ends the query.
//! - [`KeepAliveManager`] keeps one liveness ping timer and one relay
//!   heartbeat timer per connected peer. [`KeepAliveService`] drives it from
//!   the connection lifecycle events.
//!
//! [`WakuNode`] wires both to a single [`PeerDirectory`](waku_transport::PeerDirectory).
//!
//! Wire format: MessagePack, one length-prefixed frame per message.

pub mod config;
pub mod error;
pub mod keepalive;
pub mod message;
pub mod metrics;
pub mod node;
pub mod select_peer;
pub mod store;
pub mod types;

pub use config::WakuConfig;
pub use error::{ErrorKind, WakuError};
pub use keepalive::{
    KeepAliveCommand, KeepAliveEntry, KeepAliveHandle, KeepAliveManager, KeepAlivePeriods,
    KeepAliveService, LivenessProbe, RelayPublisher,
};
pub use message::WakuMessage;
pub use metrics::{KeepAliveMetrics, StoreMetrics};
pub use node::{WakuNode, DEFAULT_DESIRED_PROTOCOLS};
pub use select_peer::{select_peer_for_protocol, select_random_peer};
pub use store::{
    Direction, HistoryCodec, HistoryError, HistoryQuery, HistoryResponse, HistoryRpc, Index,
    MsgPackCodec, PageCallback, PageState, PagingInfo, PeerSelection, QueryOptions, QueryOutcome,
    WakuStore,
};
pub use types::{
    now_secs, PeerId, DEFAULT_PAGE_SIZE, DEFAULT_PUBSUB_TOPIC, LIGHT_PUSH_CODEC, RELAY_CODEC,
    RELAY_CODECS, RELAY_PING_CONTENT_TOPIC, STORE_CODEC,
};
