//! Basic type definitions for the chat client
//!
//! Provides newtype wrappers for identifiers and the small enums the
//! service encodes as loosely typed scalars:
//! - `RoomId`: numeric room identifier
//! - `MessageId`: send timestamp used as the message identifier
//! - `RoomType`, `Gender`, `Group`, `Status`, `AccountService`

use serde::Serialize;
use serde_json::Value;

use crate::adapter::{value_as_i64, value_as_str};

/// Room identifier (newtype pattern)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(pub i64);

impl From<i64> for RoomId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identifier
///
/// The service identifies a message by its send timestamp, which is only
/// unique within one room at the timestamp's granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl From<i64> for MessageId {
    fn from(ts: i64) -> Self {
        Self(ts)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room type (`channelType` on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    #[default]
    Public,
    Private,
}

impl RoomType {
    /// 0 is public; 1 and 2 are both private channels
    pub fn from_wire(value: Option<&Value>) -> Self {
        match value.and_then(value_as_i64) {
            Some(1) | Some(2) => RoomType::Private,
            _ => RoomType::Public,
        }
    }
}

/// User gender (`sx`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Unspecified,
    Female,
    Male,
}

impl Gender {
    pub fn from_wire(value: Option<&Value>) -> Self {
        match value.and_then(value_as_i64) {
            Some(1) => Gender::Female,
            Some(2) => Gender::Male,
            _ => Gender::Unspecified,
        }
    }
}

/// Group the user belongs to (`g`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Group {
    pub fn from_wire(value: Option<&Value>) -> Self {
        match value.and_then(value_as_str) {
            Some("moderator") => Group::Moderator,
            Some("admin") => Group::Admin,
            _ => Group::User,
        }
    }
}

/// Current availability of the user (`s`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Online,
    Away,
    DoNotDisturb,
    Invisible,
}

impl Status {
    pub fn from_wire(value: Option<&Value>) -> Self {
        match value.and_then(value_as_str) {
            Some("away") => Status::Away,
            Some("dnd") => Status::DoNotDisturb,
            Some("invis") => Status::Invisible,
            _ => Status::Online,
        }
    }

    /// Wire value for status requests (empty means online)
    pub fn as_wire(&self) -> &'static str {
        match self {
            Status::Online => "",
            Status::Away => "away",
            Status::DoNotDisturb => "dnd",
            Status::Invisible => "invis",
        }
    }
}

/// Service where an account is registered (`accountType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountService {
    #[default]
    Guest,
    Chatovod,
    Facebook,
    Google,
    Yandex,
    Vk,
    MailRu,
    OkRu,
}

impl AccountService {
    pub fn from_wire(value: Option<&Value>) -> Self {
        match value.and_then(value_as_str) {
            Some("ch") => AccountService::Chatovod,
            Some("fb") => AccountService::Facebook,
            Some("go") => AccountService::Google,
            Some("ya") => AccountService::Yandex,
            Some("vk") => AccountService::Vk,
            Some("ma") => AccountService::MailRu,
            Some("od") => AccountService::OkRu,
            _ => AccountService::Guest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_room_type_from_wire() {
        assert_eq!(RoomType::from_wire(Some(&json!(0))), RoomType::Public);
        assert_eq!(RoomType::from_wire(Some(&json!(1))), RoomType::Private);
        assert_eq!(RoomType::from_wire(Some(&json!(2))), RoomType::Private);
        assert_eq!(RoomType::from_wire(None), RoomType::Public);
    }

    #[test]
    fn test_user_enums_fall_back_to_default() {
        assert_eq!(Gender::from_wire(Some(&json!("2"))), Gender::Male);
        assert_eq!(Gender::from_wire(Some(&Value::Null)), Gender::Unspecified);
        assert_eq!(Group::from_wire(Some(&json!("admin"))), Group::Admin);
        assert_eq!(Group::from_wire(Some(&json!("owner"))), Group::User);
        assert_eq!(Status::from_wire(Some(&json!("invis"))), Status::Invisible);
        assert_eq!(Status::from_wire(None), Status::Online);
    }

    #[test]
    fn test_account_service_from_wire() {
        assert_eq!(
            AccountService::from_wire(Some(&json!("vk"))),
            AccountService::Vk
        );
        assert_eq!(AccountService::from_wire(None), AccountService::Guest);
    }

    #[test]
    fn test_message_id_display() {
        assert_eq!(MessageId(1470000000123).to_string(), "1470000000123");
        assert_eq!(RoomId::from(42).to_string(), "42");
    }
}
