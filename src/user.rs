//! User struct definition
//!
//! Represents a chat participant as announced by `user_enter` events.

use serde::Serialize;

use crate::adapter::AdaptedEvent;
use crate::error::StateError;
use crate::types::{Gender, Group, Status};

/// Chat user
///
/// Nicknames identify users case-insensitively but keep their display case.
/// Guests have no numeric id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// Nickname as displayed
    pub nickname: String,
    /// Account id (None for guests)
    pub id: Option<i64>,
    pub gender: Gender,
    pub group: Group,
    pub status: Status,
    /// Nickname colour code
    pub nickname_colour: Option<String>,
    /// Message colour code
    pub message_colour: Option<String>,
    pub vip: bool,
    pub bold_nickname: bool,
    pub bold_message: bool,
}

impl User {
    /// Create a user with default attributes
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            id: None,
            gender: Gender::default(),
            group: Group::default(),
            status: Status::default(),
            nickname_colour: None,
            message_colour: None,
            vip: false,
            bold_nickname: false,
            bold_message: false,
        }
    }

    /// Build a user from an adapted `user_enter` event
    pub fn from_event(event: &AdaptedEvent) -> Result<Self, StateError> {
        Ok(Self {
            nickname: event.require_string("nickname")?,
            id: event.get_i64("id"),
            gender: Gender::from_wire(event.get("gender")),
            group: Group::from_wire(event.get("group")),
            status: Status::from_wire(event.get("status")),
            nickname_colour: event.get_string("nickname_colour"),
            message_colour: event.get_string("message_colour"),
            vip: event.get_bool("vip").unwrap_or(false),
            bold_nickname: event.get_bool("bold_nickname").unwrap_or(false),
            bold_message: event.get_bool("bold_message").unwrap_or(false),
        })
    }

    /// Key used for case-insensitive lookups
    pub fn key(&self) -> String {
        nickname_key(&self.nickname)
    }

    /// Check if this user has no registered account
    pub fn is_guest(&self) -> bool {
        self.id.is_none()
    }

    /// Check if this user is a moderator or an admin
    pub fn is_staff(&self) -> bool {
        matches!(self.group, Group::Moderator | Group::Admin)
    }
}

/// Case-fold a nickname for identity comparisons
pub fn nickname_key(nickname: &str) -> String {
    nickname.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EventAdapter;
    use crate::registry::EventRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn adapt(raw: serde_json::Value) -> AdaptedEvent {
        EventAdapter::new(Arc::new(EventRegistry::chatovod().unwrap()))
            .adapt(&raw)
            .unwrap()
    }

    #[test]
    fn test_user_from_event() {
        let user = User::from_event(&adapt(json!({
            "t": "ue",
            "nick": "Alice",
            "id": "3000000",
            "sx": 1,
            "g": "moderator",
            "s": "away",
            "c": "ff0000",
            "vip": true,
            "b": 1
        })))
        .unwrap();

        assert_eq!(user.nickname, "Alice");
        assert_eq!(user.id, Some(3000000));
        assert_eq!(user.gender, Gender::Female);
        assert_eq!(user.status, Status::Away);
        assert_eq!(user.nickname_colour.as_deref(), Some("ff0000"));
        assert!(user.vip);
        assert!(user.bold_nickname);
        assert!(!user.bold_message);
        assert!(user.is_staff());
        assert!(!user.is_guest());
    }

    #[test]
    fn test_guest_user() {
        let user = User::from_event(&adapt(json!({"t": "ue", "nick": "Guest42"}))).unwrap();

        assert!(user.is_guest());
        assert_eq!(user.group, Group::User);
        assert_eq!(user.key(), "guest42");
    }

    #[test]
    fn test_user_requires_nickname() {
        let err = User::from_event(&adapt(json!({"t": "ue", "id": 1}))).unwrap_err();
        assert!(matches!(err, StateError::MissingField { field: "nickname", .. }));
    }
}
