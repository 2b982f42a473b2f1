//! Chat message definition
//!
//! Messages are built from adapted `message` events and handed to the
//! consumer; the chat state keeps no copy of them.

use serde::Serialize;
use serde_json::Value;

use crate::adapter::{value_as_string, AdaptedEvent};
use crate::error::StateError;
use crate::types::{MessageId, RoomId};

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Send timestamp, used by the service as the message id
    pub id: MessageId,
    /// Room the message was posted in
    pub room_id: RoomId,
    /// Author nickname
    pub author: String,
    /// Author account id, resolved against the user list when known
    pub author_id: Option<i64>,
    /// Message text
    pub content: String,
    /// Private recipients ("to" nicknames)
    pub recipients: Vec<String>,
    /// Sent with the /me command
    pub cmd_me: bool,
    /// Replayed history rather than a live message
    pub old: bool,
    /// Loaded through an explicit history fetch
    pub fetched: bool,
    /// Already seen by this session
    pub seen: bool,
}

impl Message {
    /// Build a message from an adapted `message` event
    pub fn from_event(event: &AdaptedEvent) -> Result<Self, StateError> {
        let recipients = match event.get("recipients") {
            Some(Value::Array(items)) => items.iter().filter_map(value_as_string).collect(),
            Some(other) => value_as_string(other).into_iter().collect(),
            None => Vec::new(),
        };

        Ok(Self {
            id: MessageId(event.require_i64("timestamp")?),
            room_id: RoomId(event.require_i64("room_id")?),
            author: event.require_string("author")?,
            author_id: None,
            content: event.get_string("content").unwrap_or_default(),
            recipients,
            cmd_me: event.get_bool("cmd_me").unwrap_or(false),
            old: event.get_bool("old").unwrap_or(false),
            fetched: event.get_bool("fetched").unwrap_or(false),
            seen: !event.get_bool("unseen").unwrap_or(true),
        })
    }

    /// Check if the message was addressed to specific users
    pub fn is_private(&self) -> bool {
        !self.recipients.is_empty()
    }

    /// Check if the message is history (replayed or fetched)
    pub fn is_old(&self) -> bool {
        self.old || self.fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EventAdapter;
    use crate::registry::EventRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn adapt(raw: Value) -> AdaptedEvent {
        EventAdapter::new(Arc::new(EventRegistry::chatovod().unwrap()))
            .adapt(&raw)
            .unwrap()
    }

    #[test]
    fn test_message_from_event() {
        let message = Message::from_event(&adapt(json!({
            "t": "m",
            "ts": 1470000000123i64,
            "f": "Alice",
            "m": "hello",
            "r": 1,
            "to": ["Bob"],
            "nh": true,
            "u": false
        })))
        .unwrap();

        assert_eq!(message.id, MessageId(1470000000123));
        assert_eq!(message.room_id, RoomId(1));
        assert_eq!(message.author, "Alice");
        assert_eq!(message.content, "hello");
        assert_eq!(message.recipients, vec!["Bob".to_string()]);
        assert!(message.is_private());
        assert!(message.cmd_me);
        assert!(message.seen);
        assert!(!message.is_old());
    }

    #[test]
    fn test_message_defaults() {
        let message = Message::from_event(&adapt(json!({
            "t": "m",
            "ts": "100",
            "f": "Alice",
            "m": "hi",
            "r": "3",
            "pp": true
        })))
        .unwrap();

        // Absent unseen flag means the message was not seen yet
        assert!(!message.seen);
        assert!(!message.cmd_me);
        assert!(message.recipients.is_empty());
        assert!(message.is_old());
    }

    #[test]
    fn test_message_requires_timestamp() {
        let err = Message::from_event(&adapt(json!({"t": "m", "f": "A", "r": 1}))).unwrap_err();
        assert!(matches!(err, StateError::MissingField { field: "timestamp", .. }));
    }
}
