//! Consumer-facing chat events
//!
//! The chat state reports everything it does not keep (messages, deletions,
//! service errors, pagination hints) through an [`EventSink`].

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::ServiceError;
use crate::message::Message;
use crate::types::{MessageId, RoomId};

/// Chat state → consumer event
///
/// Uses a tagged enum with snake_case naming.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// New message
    Message { message: Message },
    /// Messages removed from a room
    MessagesDeleted {
        room_id: RoomId,
        messages: Vec<MessageId>,
    },
    /// Private messages marked as read
    MessagesRead {
        room_id: Option<RoomId>,
        since: Option<i64>,
        until: Option<i64>,
    },
    /// Room opened (or re-opened) by the service
    RoomOpened { room_id: RoomId, focus: bool },
    /// Room attributes changed
    RoomUpdated { room_id: RoomId },
    /// Room closed
    RoomClosed { room_id: RoomId },
    /// Room history cleared
    RoomCleared {
        room_id: Option<RoomId>,
        scope: Option<String>,
    },
    /// User entered the chat
    UserEntered { nickname: String },
    /// User left the chat
    UserLeft { nickname: String },
    /// User joined a room
    UserEnteredRoom {
        room_id: Option<RoomId>,
        nickname: Option<String>,
    },
    /// User left a room
    UserLeftRoom {
        room_id: Option<RoomId>,
        nickname: Option<String>,
    },
    /// A moderator banned a user
    UserBanned {
        room_id: Option<RoomId>,
        nickname: Option<String>,
        author: Option<String>,
        duration: Option<i64>,
        comment: Option<String>,
    },
    /// Whether older history can be loaded for a room
    HasOlderEvents { room_id: Option<RoomId>, value: bool },
    /// Moderation details about a user
    ModerationInfo { info: Map<String, Value> },
    /// Number of rooms in the chat
    RoomCount { count: i64 },
    /// The service asked to focus a tab
    TabActivated {
        room_id: Option<RoomId>,
        scope: Option<String>,
    },
    /// Error reported by the service
    Error { error: ServiceError },
}

/// Receiver of chat events
///
/// Called synchronously while a batch is being reduced.
pub trait EventSink {
    fn dispatch(&mut self, event: ChatEvent);
}

impl EventSink for Vec<ChatEvent> {
    fn dispatch(&mut self, event: ChatEvent) {
        self.push(event);
    }
}

impl EventSink for mpsc::UnboundedSender<ChatEvent> {
    fn dispatch(&mut self, event: ChatEvent) {
        if self.send(event).is_err() {
            warn!("Event receiver dropped, discarding chat event");
        }
    }
}
