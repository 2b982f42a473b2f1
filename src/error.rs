//! Error types for the Chatovod client
//!
//! One enum per concern (registry, adapter, chat state, service errors,
//! ban list parsing), folded into [`ChatError`] for callers that only
//! need a single result type. Uses thiserror for ergonomic definitions.

use serde::Serialize;
use thiserror::Error;

use crate::adapter::AdaptedEvent;
use crate::types::RoomId;

/// Crate-level error
///
/// Distinguishes transport failures, protocol decoding failures,
/// chat state violations and errors reported by the service itself.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Event registry misuse (fatal, programmer error)
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Wire event could not be adapted
    #[error("Adapter error: {0}")]
    Adapt(#[from] AdaptError),

    /// Chat state rejected an event or operation
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Error reported by the chat service
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Ban list could not be parsed
    #[error("Ban list error: {0}")]
    BanList(#[from] BanParseError),

    /// The service answered with a non-success status
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// Whether this error belongs to the connection family
    ///
    /// Connection errors end the long-poll loop; the owning session
    /// decides whether to reconnect.
    pub fn is_connection(&self) -> bool {
        match self {
            ChatError::Service(err) => err.is_connection(),
            ChatError::Http(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }
}

/// Event registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A descriptor for this wire type already exists
    #[error("Event '{0}' is already registered")]
    DuplicateRegistration(String),

    /// No descriptor for this wire type
    #[error("Event '{0}' is not registered")]
    EventNotRegistered(String),
}

/// Event adapter errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdaptError {
    /// The raw event is not a JSON object
    #[error("Raw event is not an object")]
    NotAnObject,

    /// The raw event carries no string `t` tag
    #[error("Raw event has no event type")]
    MissingEventType,

    /// The wire type has no registered descriptor
    #[error("Event '{0}' is not registered")]
    EventNotRegistered(String),
}

/// Chat state errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// `room_update` targeted a room that is not open
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// An emoji references a group that was never built
    #[error("Emoji '{placeholder}' references unknown group {group_id}")]
    EmojiGroupNotFound { group_id: i64, placeholder: String },

    /// A required field is absent from an event
    #[error("Event '{event}' is missing field '{field}'")]
    MissingField { event: String, field: &'static str },

    /// A field is present but has an unusable value
    #[error("Event '{event}' has invalid field '{field}'")]
    InvalidField { event: String, field: &'static str },

    /// Live events arrived before the startup snapshot
    #[error("Chat state is not initialized")]
    NotReady,

    /// The startup snapshot was applied twice
    #[error("Chat state is already initialized")]
    AlreadyInitialized,

    /// The chat state was torn down
    #[error("Chat state is closed")]
    Closed,
}

impl StateError {
    /// Whether the error concerns one event's data rather than the
    /// lifecycle of the state itself
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            StateError::RoomNotFound(_)
                | StateError::EmojiGroupNotFound { .. }
                | StateError::MissingField { .. }
                | StateError::InvalidField { .. }
        )
    }
}

/// Errors reported by the chat service
///
/// Built from wire `error` events by [`ServiceError::from_event`], and by
/// the transport for failed logins. Serialized for consumers as a tagged
/// object.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceError {
    /// The server dropped the session; reconnect
    #[error("Connection reset: {description}")]
    ConnectionReset { description: String },

    /// Any other connection failure
    #[error("Connection error: {description}")]
    Connection { description: String },

    /// The action is not allowed
    #[error("Forbidden: {description}")]
    Forbidden { description: String },

    /// The nickname is already signed in
    #[error("Nickname already in use: {description}")]
    UnavailableName { description: String },

    /// Wrong account email or password
    #[error("The provided login or password is incorrect")]
    InvalidLogin,

    /// Any other error reported by the service
    #[error("Service error '{error_type}': {description}")]
    Http {
        error_type: String,
        description: String,
    },
}

impl ServiceError {
    /// Translate an adapted `error` event
    ///
    /// Keyed on `error_type` (`et` on the wire) and `group` (`est`).
    pub fn from_event(event: &AdaptedEvent) -> Self {
        let error_type = event.get_str("error_type").unwrap_or_default();
        let group = event.get_str("group").unwrap_or_default();
        let description = event.get_string("description").unwrap_or_default();

        match (error_type, group) {
            ("connection", "reset") => ServiceError::ConnectionReset { description },
            ("connection", _) => ServiceError::Connection { description },
            ("auth", "alreadySignedIn") => ServiceError::UnavailableName { description },
            ("auth", _) => ServiceError::Forbidden { description },
            (other, _) => ServiceError::Http {
                error_type: other.to_string(),
                description,
            },
        }
    }

    /// Whether the error terminates the event stream
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ServiceError::ConnectionReset { .. } | ServiceError::Connection { .. }
        )
    }
}

/// 12-hour clock conversion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// Hour outside 1..=12
    #[error("Invalid 12-hour clock time: {0}")]
    HourOutOfRange(u32),

    /// Period other than AM/PM
    #[error("Unknown time period '{0}'")]
    UnknownPeriod(String),
}

/// Ban list entry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BanParseError {
    /// Entry text did not match the expected layout
    #[error("Ban entry does not match the expected format")]
    Format,

    /// Numeric field could not be parsed
    #[error("Invalid number in '{field}': {value}")]
    InvalidNumber { field: &'static str, value: String },

    /// Date or time out of range
    #[error("Invalid ban expiry date")]
    InvalidDate,

    /// Hour/period pair could not be converted
    #[error(transparent)]
    Clock(#[from] ClockError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EventAdapter;
    use crate::registry::EventRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn error_event(et: &str, est: &str) -> AdaptedEvent {
        let adapter = EventAdapter::new(Arc::new(EventRegistry::chatovod().unwrap()));
        adapter
            .adapt(&json!({"t": "error", "et": et, "est": est, "error": "boom"}))
            .unwrap()
    }

    #[test]
    fn test_error_factory_connection() {
        assert_eq!(
            ServiceError::from_event(&error_event("connection", "reset")),
            ServiceError::ConnectionReset {
                description: "boom".to_string()
            }
        );
        let err = ServiceError::from_event(&error_event("connection", "timeout"));
        assert!(matches!(err, ServiceError::Connection { .. }));
        assert!(err.is_connection());
    }

    #[test]
    fn test_error_factory_auth() {
        let err = ServiceError::from_event(&error_event("auth", "alreadySignedIn"));
        assert!(matches!(err, ServiceError::UnavailableName { .. }));
        assert!(!err.is_connection());

        let err = ServiceError::from_event(&error_event("auth", "banned"));
        assert!(matches!(err, ServiceError::Forbidden { .. }));
    }

    #[test]
    fn test_error_factory_other() {
        let err = ServiceError::from_event(&error_event("flood", ""));
        assert_eq!(
            err,
            ServiceError::Http {
                error_type: "flood".to_string(),
                description: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_service_error_serialize() {
        let err = ServiceError::Forbidden {
            description: "no".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"forbidden\""));
    }

    #[test]
    fn test_data_integrity_classification() {
        assert!(StateError::RoomNotFound(RoomId(1)).is_data_integrity());
        assert!(!StateError::Closed.is_data_integrity());
        assert!(!StateError::NotReady.is_data_integrity());
    }
}
