//! Event adapter
//!
//! Turns a raw wire event (short opaque keys like `t`, `r`, `ts`) into an
//! [`AdaptedEvent`] keyed by logical names, using the descriptors held in
//! an [`EventRegistry`]. Values are left as the loosely typed JSON scalars
//! the service sends; coercion happens in the typed accessors.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AdaptError, StateError};
use crate::registry::EventRegistry;

/// Wire key holding the event type tag
pub const EVENT_TYPE_KEY: &str = "t";

/// Key holding the normalized type of an adapted event
pub const ADAPTED_TYPE_KEY: &str = "type";

/// A renamed wire event
///
/// Always carries a `type` entry. Keys without a rename pass through under
/// their wire name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AdaptedEvent(Map<String, Value>);

impl AdaptedEvent {
    /// Normalized event type
    pub fn event_type(&self) -> &str {
        self.get_str(ADAPTED_TYPE_KEY).unwrap_or_default()
    }

    /// Raw value for a key (JSON `null` counts as absent)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(value_as_str)
    }

    /// String value, numbers rendered as text
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(value_as_string)
    }

    /// Integer value, accepting numeric strings
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(value_as_i64)
    }

    /// Boolean value, accepting 0/1 and "true"/"false"
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(value_as_bool)
    }

    /// Required integer field
    pub fn require_i64(&self, key: &'static str) -> Result<i64, StateError> {
        let value = self.get(key).ok_or_else(|| self.missing(key))?;
        value_as_i64(value).ok_or_else(|| self.invalid(key))
    }

    /// Required string field
    pub fn require_string(&self, key: &'static str) -> Result<String, StateError> {
        let value = self.get(key).ok_or_else(|| self.missing(key))?;
        value_as_string(value).ok_or_else(|| self.invalid(key))
    }

    pub fn missing(&self, field: &'static str) -> StateError {
        StateError::MissingField {
            event: self.event_type().to_string(),
            field,
        }
    }

    pub fn invalid(&self, field: &'static str) -> StateError {
        StateError::InvalidField {
            event: self.event_type().to_string(),
            field,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Adapts raw wire events using a shared registry
#[derive(Debug, Clone)]
pub struct EventAdapter {
    registry: Arc<EventRegistry>,
}

impl EventAdapter {
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Adapt one raw event
    ///
    /// Fails when the event is not an object, has no `t` tag, or its type
    /// is not registered. The input is never modified.
    pub fn adapt(&self, raw: &Value) -> Result<AdaptedEvent, AdaptError> {
        let object = raw.as_object().ok_or(AdaptError::NotAnObject)?;
        self.adapt_map(object)
    }

    pub fn adapt_map(&self, raw: &Map<String, Value>) -> Result<AdaptedEvent, AdaptError> {
        let wire_type = raw
            .get(EVENT_TYPE_KEY)
            .and_then(Value::as_str)
            .ok_or(AdaptError::MissingEventType)?;

        let descriptor = self
            .registry
            .lookup(wire_type)
            .map_err(|_| AdaptError::EventNotRegistered(wire_type.to_string()))?;

        let mut adapted = transform(raw, descriptor.field_renames());
        adapted.insert(
            ADAPTED_TYPE_KEY.to_string(),
            Value::String(descriptor.adapted_type().to_string()),
        );

        Ok(AdaptedEvent(adapted))
    }
}

/// Rename the keys of a raw object, keeping values untouched
pub fn transform(raw: &Map<String, Value>, renames: &HashMap<String, String>) -> Map<String, Value> {
    raw.iter()
        .map(|(key, value)| {
            let name = renames.get(key).unwrap_or(key);
            (name.clone(), value.clone())
        })
        .collect()
}

pub(crate) fn value_as_str(value: &Value) -> Option<&str> {
    value.as_str()
}

pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EventDescriptor;
    use serde_json::json;

    fn adapter_with(descriptor: EventDescriptor) -> EventAdapter {
        let mut registry = EventRegistry::new();
        registry.register(descriptor).unwrap();
        EventAdapter::new(Arc::new(registry))
    }

    #[test]
    fn test_transform_keeps_input() {
        let raw = json!({"t": "r", "id": 123, "r": "Room name", "c": 100});
        let renames: HashMap<String, String> = [("r", "room"), ("c", "users_count")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let transformed = transform(raw.as_object().unwrap(), &renames);

        assert_eq!(
            Value::Object(transformed),
            json!({"t": "r", "id": 123, "room": "Room name", "users_count": 100})
        );
        assert_eq!(raw, json!({"t": "r", "id": 123, "r": "Room name", "c": 100}));
    }

    #[test]
    fn test_adapt_keeps_wire_type() {
        let adapter = adapter_with(EventDescriptor::new("u").renames([("i", "id"), ("u", "user")]));

        let adapted = adapter.adapt(&json!({"t": "u", "i": 1, "u": "Admin"})).unwrap();

        assert_eq!(adapted.event_type(), "u");
        assert_eq!(
            Value::Object(adapted.into_map()),
            json!({"t": "u", "type": "u", "id": 1, "user": "Admin"})
        );
    }

    #[test]
    fn test_adapt_restated_type() {
        let adapter = adapter_with(
            EventDescriptor::new("u")
                .restated("user")
                .renames([("i", "id"), ("u", "user")]),
        );

        let adapted = adapter.adapt(&json!({"t": "u", "i": 1, "u": "Admin"})).unwrap();

        assert_eq!(adapted.event_type(), "user");
        assert_eq!(adapted.get_i64("id"), Some(1));
        assert_eq!(adapted.get_str("user"), Some("Admin"));
    }

    #[test]
    fn test_adapt_passes_unknown_keys_through() {
        let adapter = adapter_with(EventDescriptor::new("m").renames([("f", "author")]));

        let adapted = adapter
            .adapt(&json!({"t": "m", "f": "alice", "brandNew": [1, 2]}))
            .unwrap();

        assert_eq!(adapted.get("brandNew"), Some(&json!([1, 2])));
        assert_eq!(adapted.get_str("t"), Some("m"));
        assert!(!adapted.contains("f"));
    }

    #[test]
    fn test_adapt_missing_event_type() {
        let adapter = adapter_with(EventDescriptor::new("m"));

        assert_eq!(
            adapter.adapt(&json!({"f": "alice"})).unwrap_err(),
            AdaptError::MissingEventType
        );
        assert_eq!(
            adapter.adapt(&json!({"t": 5})).unwrap_err(),
            AdaptError::MissingEventType
        );
        assert_eq!(
            adapter.adapt(&json!([1, 2])).unwrap_err(),
            AdaptError::NotAnObject
        );
    }

    #[test]
    fn test_adapt_unregistered() {
        let adapter = adapter_with(EventDescriptor::new("m"));

        assert_eq!(
            adapter.adapt(&json!({"t": "zz"})).unwrap_err(),
            AdaptError::EventNotRegistered("zz".to_string())
        );
    }

    #[test]
    fn test_room_open_scenario() {
        let adapter = EventAdapter::new(Arc::new(EventRegistry::chatovod().unwrap()));

        let adapted = adapter
            .adapt(&json!({
                "t": "ro",
                "r": 42,
                "channelType": 0,
                "title": "Lobby",
                "closeable": true,
                "showEnterLeave": false
            }))
            .unwrap();

        assert_eq!(
            Value::Object(adapted.into_map()),
            json!({
                "t": "ro",
                "type": "room_open",
                "room_id": 42,
                "room_type": 0,
                "name": "Lobby",
                "can_be_closed": true,
                "display_user_flow": false
            })
        );
    }

    #[test]
    fn test_typed_accessors() {
        let adapter = adapter_with(EventDescriptor::new("x"));
        let adapted = adapter
            .adapt(&json!({"t": "x", "n": "17", "b": 1, "s": 42, "z": null}))
            .unwrap();

        assert_eq!(adapted.get_i64("n"), Some(17));
        assert_eq!(adapted.get_bool("b"), Some(true));
        assert_eq!(adapted.get_string("s"), Some("42".to_string()));
        assert!(!adapted.contains("z"));
        assert_eq!(
            adapted.require_i64("z").unwrap_err(),
            StateError::MissingField {
                event: "x".to_string(),
                field: "z"
            }
        );
        assert!(matches!(
            adapted.require_i64("b"),
            Ok(1)
        ));
    }

    #[test]
    fn test_fractional_numbers_rejected() {
        let adapter = adapter_with(EventDescriptor::new("x"));
        let adapted = adapter
            .adapt(&json!({"t": "x", "ts": 1500.5, "whole": 1500.0}))
            .unwrap();

        assert_eq!(adapted.get_i64("ts"), None);
        assert!(matches!(
            adapted.require_i64("ts").unwrap_err(),
            StateError::InvalidField { field: "ts", .. }
        ));
        assert_eq!(adapted.get_i64("whole"), Some(1500));
        assert_eq!(value_as_i64(&json!(1e300)), None);
    }
}
