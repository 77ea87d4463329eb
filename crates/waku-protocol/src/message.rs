use serde::{Deserialize, Serialize};

use crate::types::now_secs;

/// A Waku message: opaque payload tagged with a content topic.
///
/// Payload encryption/decryption happens outside this crate; the store and
/// keep-alive code only move bytes around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakuMessage {
    pub payload: Vec<u8>,
    pub content_topic: String,
    pub version: u32,
    /// Sender timestamp, fractional seconds since UNIX epoch.
    pub timestamp: Option<f64>,
}

impl WakuMessage {
    /// Version-0 (unencrypted) message stamped with the current time.
    pub fn new(payload: Vec<u8>, content_topic: impl Into<String>) -> Self {
        Self {
            payload,
            content_topic: content_topic.into(),
            version: 0,
            timestamp: Some(now_secs()),
        }
    }

    /// Payload as UTF-8, if it is valid UTF-8.
    pub fn payload_as_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_defaults() {
        let msg = WakuMessage::new(b"hi".to_vec(), "/app/1/chat/proto");
        assert_eq!(msg.version, 0);
        assert_eq!(msg.content_topic, "/app/1/chat/proto");
        assert!(msg.timestamp.is_some());
        assert_eq!(msg.payload_as_utf8(), Some("hi"));
    }
}
