//! History RPC: the frame body exchanged on the store protocol.
use serde::{Deserialize, Serialize};

use crate::message::WakuMessage;

/// Retrieval order. Within a page, messages follow this direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    #[default]
    Backward,
}

/// Continuation cursor: the index of the last message of a page.
///
/// Opaque to the client; echoed back unchanged on the next request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub digest: Vec<u8>,
    pub received_time: f64,
    pub sender_time: f64,
    pub pubsub_topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingInfo {
    pub page_size: u64,
    pub cursor: Option<Index>,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilter {
    pub content_topic: String,
}

/// One history request. An empty `content_filters` list means "all topics".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub pubsub_topic: String,
    pub content_filters: Vec<ContentFilter>,
    pub paging_info: Option<PagingInfo>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl HistoryQuery {
    pub fn new(
        pubsub_topic: impl Into<String>,
        content_topics: &[String],
        paging_info: PagingInfo,
    ) -> Self {
        Self {
            pubsub_topic: pubsub_topic.into(),
            content_filters: content_topics
                .iter()
                .map(|topic| ContentFilter {
                    content_topic: topic.clone(),
                })
                .collect(),
            paging_info: Some(paging_info),
            start_time: None,
            end_time: None,
        }
    }

    /// Restrict to messages sent within `[start, end]` (seconds).
    pub fn with_time_range(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn page_size(&self) -> Option<u64> {
        self.paging_info.as_ref().map(|p| p.page_size)
    }

    pub fn cursor(&self) -> Option<&Index> {
        self.paging_info.as_ref().and_then(|p| p.cursor.as_ref())
    }
}

/// Server-side status of a history response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryError {
    #[default]
    None,
    InvalidCursor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<WakuMessage>,
    pub paging_info: Option<PagingInfo>,
    pub error: HistoryError,
}

impl HistoryResponse {
    /// Page size reported by the server, ignoring a missing or zero value.
    pub fn reported_page_size(&self) -> Option<u64> {
        self.paging_info
            .as_ref()
            .map(|p| p.page_size)
            .filter(|&n| n > 0)
    }

    pub fn cursor(&self) -> Option<&Index> {
        self.paging_info.as_ref().and_then(|p| p.cursor.as_ref())
    }
}

/// Envelope for both directions: a request carries `query`, a reply
/// carries `response` under the same `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRpc {
    pub request_id: String,
    pub query: Option<HistoryQuery>,
    pub response: Option<HistoryResponse>,
}

impl HistoryRpc {
    /// New request with a random UUID v4 request id.
    pub fn query(query: HistoryQuery) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            query: Some(query),
            response: None,
        }
    }

    /// Reply to `request_id`.
    pub fn response(request_id: impl Into<String>, response: HistoryResponse) -> Self {
        Self {
            request_id: request_id.into(),
            query: None,
            response: Some(response),
        }
    }
}
