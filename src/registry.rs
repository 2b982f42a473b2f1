//! Event schema registry
//!
//! Maps wire event tags (`so`, `m`, `ro`, ...) to descriptors holding the
//! field rename table and an optional restated event type. The registry is
//! filled once at startup and only read afterwards, so it can be shared
//! behind an `Arc` without locking.

use std::collections::HashMap;

use crate::error::RegistryError;

/// Adapted event type names produced by the default registry
pub mod kind {
    pub const SET_OPTION: &str = "set_option";
    pub const ACCOUNT_INFO: &str = "cls";
    pub const CHAT_EMOJIS: &str = "chat_emojis";
    pub const ERROR: &str = "error";
    pub const MESSAGE: &str = "message";
    pub const MESSAGE_DELETE: &str = "message_delete";
    pub const MESSAGE_READ: &str = "message_read";
    pub const ROOM_UPDATE: &str = "room_update";
    pub const ROOM_OPEN: &str = "room_open";
    pub const ROOM_CLOSE: &str = "room_close";
    pub const ROOM_CLEAR: &str = "room_clear";
    pub const USER_ENTER: &str = "user_enter";
    pub const USER_LEAVE: &str = "user_leave";
    pub const USER_ENTER_ROOM: &str = "user_enter_room";
    pub const USER_LEAVE_ROOM: &str = "user_leave_room";
    pub const USER_BAN: &str = "user_ban";
    pub const HAS_OLDER_EVENTS: &str = "has_older_events";
    pub const MODERATION_INFO: &str = "moderation_info";
    pub const ROOM_COUNT: &str = "room_count";
    pub const TAB_ACTIVATE: &str = "tab_activate";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const TRY_AUTO_LOGIN: &str = "try_auto_login";
}

/// Describes how one wire event type is adapted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    wire_type: String,
    restated_type: Option<String>,
    field_renames: HashMap<String, String>,
}

impl EventDescriptor {
    /// Create a descriptor with no renames that keeps its wire type
    pub fn new(wire_type: impl Into<String>) -> Self {
        Self {
            wire_type: wire_type.into(),
            restated_type: None,
            field_renames: HashMap::new(),
        }
    }

    /// Relabel the adapted event type
    pub fn restated(mut self, restated_type: impl Into<String>) -> Self {
        self.restated_type = Some(restated_type.into());
        self
    }

    /// Rename one wire key (a later rename of the same key replaces it)
    pub fn rename(mut self, wire_key: impl Into<String>, logical: impl Into<String>) -> Self {
        self.field_renames.insert(wire_key.into(), logical.into());
        self
    }

    /// Rename several wire keys at once
    pub fn renames<'a>(self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        pairs
            .into_iter()
            .fold(self, |descriptor, (wire, logical)| descriptor.rename(wire, logical))
    }

    pub fn wire_type(&self) -> &str {
        &self.wire_type
    }

    pub fn restated_type(&self) -> Option<&str> {
        self.restated_type.as_deref()
    }

    /// The `type` an adapted event of this kind carries
    pub fn adapted_type(&self) -> &str {
        self.restated_type.as_deref().unwrap_or(&self.wire_type)
    }

    pub fn field_renames(&self) -> &HashMap<String, String> {
        &self.field_renames
    }

    /// Logical name for a wire key (the key itself when not renamed)
    pub fn logical_name<'a>(&'a self, wire_key: &'a str) -> &'a str {
        self.field_renames
            .get(wire_key)
            .map(String::as_str)
            .unwrap_or(wire_key)
    }
}

/// Collection of event descriptors keyed by wire type
#[derive(Debug, Default)]
pub struct EventRegistry {
    descriptors: HashMap<String, EventDescriptor>,
}

impl EventRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor
    ///
    /// Rejects a second descriptor for the same wire type.
    pub fn register(&mut self, descriptor: EventDescriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(descriptor.wire_type()) {
            return Err(RegistryError::DuplicateRegistration(
                descriptor.wire_type().to_string(),
            ));
        }
        self.descriptors
            .insert(descriptor.wire_type().to_string(), descriptor);
        Ok(())
    }

    /// Look up the descriptor for a wire type
    pub fn lookup(&self, wire_type: &str) -> Result<&EventDescriptor, RegistryError> {
        self.descriptors
            .get(wire_type)
            .ok_or_else(|| RegistryError::EventNotRegistered(wire_type.to_string()))
    }

    pub fn contains(&self, wire_type: &str) -> bool {
        self.descriptors.contains_key(wire_type)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registry with every event type the Chatovod chat API is known to send
    pub fn chatovod() -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        registry.register(
            EventDescriptor::new("so")
                .restated(kind::SET_OPTION)
                .renames([("k", "option"), ("v", "value")]),
        )?;
        registry.register(EventDescriptor::new("cls").renames([
            ("accountName", "email"),
            ("accountType", "account_type"),
            ("accountGroup", "user_group"),
            ("lastNick", "last_nickname"),
        ]))?;
        registry.register(
            EventDescriptor::new("sl").restated(kind::CHAT_EMOJIS).renames([
                ("smileys", "emojis"),
                ("cats", "groups"),
                ("dp", "default_path"),
                ("p", "custom_path"),
            ]),
        )?;
        registry.register(EventDescriptor::new("error").renames([
            ("et", "error_type"),
            ("est", "group"),
            ("error", "description"),
            ("r", "room_id"),
            ("ts", "timestamp"),
        ]))?;

        // Messages
        registry.register(EventDescriptor::new("m").restated(kind::MESSAGE).renames([
            ("ts", "timestamp"),
            ("f", "author"),
            ("m", "content"),
            ("r", "room_id"),
            ("to", "recipients"),
            ("nh", "cmd_me"),
            ("s", "old"),
            ("pp", "fetched"),
            ("u", "unseen"),
        ]))?;
        registry.register(
            EventDescriptor::new("md")
                .restated(kind::MESSAGE_DELETE)
                .renames([("ts", "messages"), ("r", "room_id")]),
        )?;
        registry.register(
            EventDescriptor::new("pmr")
                .restated(kind::MESSAGE_READ)
                .renames([("r", "room_id"), ("fromTime", "since"), ("toTime", "until")]),
        )?;

        // Rooms
        registry.register(
            EventDescriptor::new("ru").restated(kind::ROOM_UPDATE).renames([
                ("r", "room_id"),
                ("title", "name"),
                ("closeable", "can_be_closed"),
                ("showEnterLeave", "display_user_flow"),
            ]),
        )?;
        registry.register(EventDescriptor::new("ro").restated(kind::ROOM_OPEN).renames([
            ("r", "room_id"),
            ("channelType", "room_type"),
            ("active", "set_focus"),
            ("title", "name"),
            ("closeable", "can_be_closed"),
            ("showEnterLeave", "display_user_flow"),
        ]))?;
        registry.register(
            EventDescriptor::new("rc")
                .restated(kind::ROOM_CLOSE)
                .renames([("r", "room_id"), ("iwid", "window_id")]),
        )?;
        registry.register(
            EventDescriptor::new("tc")
                .restated(kind::ROOM_CLEAR)
                .renames([("id", "room_id"), ("type", "scope")]),
        )?;
        registry.register(
            EventDescriptor::new("urc").restated(kind::ROOM_COUNT),
        )?;
        registry.register(
            EventDescriptor::new("hoe")
                .restated(kind::HAS_OLDER_EVENTS)
                .renames([("r", "room_id"), ("hasOlderEvents", "value")]),
        )?;

        // Users
        registry.register(
            EventDescriptor::new("ue")
                .restated(kind::USER_ENTER)
                .renames(USER_FIELDS),
        )?;
        registry.register(
            EventDescriptor::new("ul")
                .restated(kind::USER_LEAVE)
                .renames([("nick", "nickname")]),
        )?;
        registry.register(
            EventDescriptor::new("uer")
                .restated(kind::USER_ENTER_ROOM)
                .renames([("r", "room_id"), ("nick", "nickname")]),
        )?;
        registry.register(
            EventDescriptor::new("ulr")
                .restated(kind::USER_LEAVE_ROOM)
                .renames([("r", "room_id"), ("nick", "nickname")]),
        )?;
        registry.register(EventDescriptor::new("ub").restated(kind::USER_BAN).renames([
            ("r", "room_id"),
            ("ts", "timestamp"),
            ("modNick", "author"),
            ("bannedNick", "nickname"),
            ("minutes", "duration"),
        ]))?;
        registry.register(
            EventDescriptor::new("mi").restated(kind::MODERATION_INFO).renames([
                ("messageIp", "message_ip"),
                ("lastIp", "last_ip"),
                ("lastIpGeo", "location"),
                ("lastUserAgent", "user_agent"),
                ("nickId", "nick_id"),
                ("accountId", "account_id"),
                ("lastEnterToChat", "last_login"),
                ("createdInChat", "nickname_created_at"),
                ("created", "registered_at"),
                ("accountType", "account_service"),
                ("accountTypeTitle", "account_service_domain"),
            ]),
        )?;

        // Session
        registry.register(
            EventDescriptor::new("ta")
                .restated(kind::TAB_ACTIVATE)
                .renames([("id", "room_id"), ("iwid", "window_id"), ("type", "scope")]),
        )?;
        registry.register(EventDescriptor::new("rnd").restated(kind::HEARTBEAT))?;
        registry.register(EventDescriptor::new("tal").restated(kind::TRY_AUTO_LOGIN))?;
        registry.register(EventDescriptor::new("cpo"))?;

        Ok(registry)
    }
}

/// Renames shared by every event that carries a full user record
pub const USER_FIELDS: [(&str, &str); 8] = [
    ("nick", "nickname"),
    ("sx", "gender"),
    ("g", "group"),
    ("s", "status"),
    ("c", "nickname_colour"),
    ("tc", "message_colour"),
    ("b", "bold_nickname"),
    ("tb", "bold_message"),
];
