//! Room struct definition
//!
//! Represents an open chat room (public channel or private conversation).

use serde::Serialize;

use crate::adapter::AdaptedEvent;
use crate::error::StateError;
use crate::types::{RoomId, RoomType};

/// Chat room
///
/// Created by `room_open`, changed by `room_update`, dropped by `room_close`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Public channel or private conversation
    pub room_type: RoomType,
    /// Room title
    pub name: Option<String>,
    /// Whether the client may close the room
    pub can_be_closed: bool,
    /// Whether enter/leave notices are shown
    pub display_user_flow: bool,
    /// Optional welcome message
    pub welcome_message: Option<String>,
}

impl Room {
    /// Create a public room with default flags
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            room_type: RoomType::default(),
            name: None,
            can_be_closed: false,
            display_user_flow: false,
            welcome_message: None,
        }
    }

    /// Build a room from an adapted `room_open` event
    pub fn from_event(event: &AdaptedEvent) -> Result<Self, StateError> {
        let mut room = Room::new(RoomId(event.require_i64("room_id")?));
        room.update(event);
        Ok(room)
    }

    /// Apply the fields present in a `room_open`/`room_update` event
    ///
    /// Absent fields keep their current value.
    pub fn update(&mut self, event: &AdaptedEvent) {
        if event.contains("room_type") {
            self.room_type = RoomType::from_wire(event.get("room_type"));
        }
        if let Some(name) = event.get_string("name") {
            self.name = Some(name);
        }
        if let Some(can_be_closed) = event.get_bool("can_be_closed") {
            self.can_be_closed = can_be_closed;
        }
        if let Some(display_user_flow) = event.get_bool("display_user_flow") {
            self.display_user_flow = display_user_flow;
        }
        if let Some(welcome) = event.get_string("welcome") {
            self.welcome_message = Some(welcome);
        }
    }

    /// Check if this is a private conversation
    pub fn is_private(&self) -> bool {
        self.room_type == RoomType::Private
    }

    /// Display name ("Unnamed" before a title arrives)
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed")
    }
}
