//! Store protocol client: paginated history queries.
//!
//! One query = a strictly sequential series of round trips against a single
//! peer. Each round trip opens a fresh stream, sends one framed
//! [`HistoryRpc`] query and reads one framed reply. The [`PageState`]
//! transition decides whether another page is requested.

pub mod codec;
pub mod paging;
pub mod rpc;

use std::fmt;
use std::sync::Arc;

use waku_transport::{read_framed, write_framed, Connection, Peer, PeerDirectory, PeerId};

use crate::config::WakuConfig;
use crate::error::WakuError;
use crate::message::WakuMessage;
use crate::metrics::StoreMetrics;
use crate::select_peer::select_peer_for_protocol;
use crate::types::{DEFAULT_PAGE_SIZE, STORE_CODEC};

pub use codec::{HistoryCodec, MsgPackCodec};
pub use paging::PageState;
pub use rpc::{
    ContentFilter, Direction, HistoryError, HistoryQuery, HistoryResponse, HistoryRpc, Index,
    PagingInfo,
};

/// Called with every page, in arrival order, before the next page is requested.
pub type PageCallback = Box<dyn FnMut(&[WakuMessage]) + Send>;

/// Which peer a query goes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeerSelection {
    /// This exact peer; it must be known and advertise the store protocol.
    Peer(PeerId),
    /// Any peer advertising the store protocol, picked at random.
    #[default]
    Any,
}

/// Options for [`WakuStore::query_history`].
pub struct QueryOptions {
    pub peer: PeerSelection,
    /// Empty = all content topics.
    pub content_topics: Vec<String>,
    /// `None` = the store's configured pubsub topic.
    pub pubsub_topic: Option<String>,
    pub direction: Direction,
    pub page_size: u64,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub callback: Option<PageCallback>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            peer: PeerSelection::Any,
            content_topics: Vec::new(),
            pubsub_topic: None,
            direction: Direction::Backward,
            page_size: DEFAULT_PAGE_SIZE,
            start_time: None,
            end_time: None,
            callback: None,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peer(mut self, peer: PeerId) -> Self {
        self.peer = PeerSelection::Peer(peer);
        self
    }

    pub fn content_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn pubsub_topic(mut self, topic: impl Into<String>) -> Self {
        self.pubsub_topic = Some(topic.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn time_range(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn callback(mut self, callback: impl FnMut(&[WakuMessage]) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("peer", &self.peer)
            .field("content_topics", &self.content_topics)
            .field("pubsub_topic", &self.pubsub_topic)
            .field("direction", &self.direction)
            .field("page_size", &self.page_size)
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Result of a history query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Messages in the order pages arrived.
    pub messages: Vec<WakuMessage>,
    /// Why the query stopped. Never `Continue`.
    pub termination: PageState,
    pub round_trips: u32,
    /// Peer that served the query.
    pub peer: PeerId,
}

impl QueryOutcome {
    /// True when a failed round trip cut the query short.
    pub fn is_truncated(&self) -> bool {
        self.termination.is_aborted()
    }

    /// The accumulated messages, or `None` if the very first round trip failed.
    pub fn into_messages(self) -> Option<Vec<WakuMessage>> {
        if self.round_trips <= 1 && self.is_truncated() {
            None
        } else {
            Some(self.messages)
        }
    }
}

/// Store protocol client.
pub struct WakuStore {
    directory: Arc<dyn PeerDirectory>,
    codec: Arc<dyn HistoryCodec>,
    pubsub_topic: String,
    max_message_size: usize,
    metrics: Arc<StoreMetrics>,
}

impl WakuStore {
    pub fn new(directory: Arc<dyn PeerDirectory>, config: &WakuConfig) -> Self {
        Self {
            directory,
            codec: Arc::new(MsgPackCodec),
            pubsub_topic: config.pubsub_topic.clone(),
            max_message_size: config.max_message_size,
            metrics: Arc::new(StoreMetrics::default()),
        }
    }

    /// Replace the wire codec (default: [`MsgPackCodec`]).
    pub fn with_codec(mut self, codec: Arc<dyn HistoryCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn pubsub_topic(&self) -> &str {
        &self.pubsub_topic
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// Retrieve stored messages from a peer, page by page.
    ///
    /// Fails before any network I/O when the query is invalid, no eligible
    /// peer exists, or the peer has no connection. Once the first stream is
    /// opened the call always returns `Ok`: a failed round trip ends the
    /// query with [`PageState::Aborted`] and the messages gathered so far.
    pub async fn query_history(&self, options: QueryOptions) -> Result<QueryOutcome, WakuError> {
        let QueryOptions {
            peer,
            content_topics,
            pubsub_topic,
            direction,
            page_size,
            start_time,
            end_time,
            mut callback,
        } = options;

        if page_size == 0 {
            return Err(WakuError::InvalidQuery("page size must be positive".into()));
        }

        let peer = self.select_peer(peer).await?;
        let connection = self
            .directory
            .connection(&peer.id)
            .await
            .ok_or(WakuError::Connection { peer: peer.id })?;

        let pubsub_topic = pubsub_topic.unwrap_or_else(|| self.pubsub_topic.clone());
        self.metrics.queries.inc();
        tracing::debug!(
            peer = %peer.id,
            %pubsub_topic,
            page_size,
            ?direction,
            "store: starting history query"
        );

        let mut messages = Vec::new();
        let mut cursor: Option<Index> = None;
        let mut round_trips = 0u32;

        let termination = loop {
            let query = HistoryQuery::new(
                pubsub_topic.as_str(),
                &content_topics,
                PagingInfo {
                    page_size,
                    cursor: cursor.take(),
                    direction,
                },
            )
            .with_time_range(start_time, end_time);

            round_trips += 1;
            self.metrics.round_trips.inc();

            let state = match self.round_trip(connection.as_ref(), query).await {
                Ok(response) => {
                    if response.error != HistoryError::None {
                        tracing::warn!(
                            peer = %peer.id,
                            error = ?response.error,
                            "store: peer reported an error"
                        );
                    }
                    let state = PageState::next(
                        page_size,
                        response.messages.len(),
                        response.reported_page_size(),
                        response.cursor().cloned(),
                    );
                    if !response.messages.is_empty() {
                        self.metrics.pages.inc();
                        self.metrics.messages.add(response.messages.len() as u64);
                        if let Some(callback) = callback.as_mut() {
                            callback(response.messages.as_slice());
                        }
                        messages.extend(response.messages);
                    }
                    state
                }
                Err(e) => {
                    tracing::warn!(
                        peer = %peer.id,
                        round_trip = round_trips,
                        "store: query aborted: {e}"
                    );
                    self.metrics.aborted.inc();
                    PageState::Aborted(e.kind())
                }
            };

            match state {
                PageState::Continue(next) => cursor = Some(next),
                PageState::DoneNoCursor => {
                    tracing::warn!(peer = %peer.id, "store: full page without cursor, stopping");
                    break PageState::DoneNoCursor;
                }
                done => break done,
            }
        };

        tracing::debug!(
            peer = %peer.id,
            round_trips,
            messages = messages.len(),
            ?termination,
            "store: history query finished"
        );

        Ok(QueryOutcome {
            messages,
            termination,
            round_trips,
            peer: peer.id,
        })
    }

    async fn select_peer(&self, selection: PeerSelection) -> Result<Peer, WakuError> {
        let peer = match selection {
            PeerSelection::Peer(id) => self
                .directory
                .peer(&id)
                .await
                .ok_or_else(|| WakuError::PeerSelection(format!("peer {id} is unknown")))?,
            PeerSelection::Any => select_peer_for_protocol(self.directory.as_ref(), STORE_CODEC)
                .await
                .ok_or_else(|| {
                    WakuError::PeerSelection(format!("no peer available for {STORE_CODEC}"))
                })?,
        };

        if !peer.supports(STORE_CODEC) {
            return Err(WakuError::PeerSelection(format!(
                "peer {} does not register the waku store protocol",
                peer.id
            )));
        }
        Ok(peer)
    }

    /// One request/response exchange on a fresh stream.
    async fn round_trip(
        &self,
        connection: &dyn Connection,
        query: HistoryQuery,
    ) -> Result<HistoryResponse, WakuError> {
        let rpc = HistoryRpc::query(query);
        let request = self.codec.encode(&rpc)?;

        let mut stream = connection
            .open_stream(STORE_CODEC)
            .await
            .map_err(|source| WakuError::Protocol {
                stage: "stream negotiation",
                source,
            })?;

        write_framed(&mut stream, &request)
            .await
            .map_err(|source| WakuError::Protocol {
                stage: "query write",
                source,
            })?;

        let reply = read_framed(&mut stream, self.max_message_size)
            .await
            .map_err(|source| WakuError::Protocol {
                stage: "reply read",
                source,
            })?;

        let reply = self.codec.decode(&reply)?;
        if reply.request_id != rpc.request_id {
            tracing::debug!(
                expected = %rpc.request_id,
                got = %reply.request_id,
                "store: reply request id mismatch"
            );
        }
        reply
            .response
            .ok_or_else(|| WakuError::Codec("no response in history rpc".into()))
    }
}
