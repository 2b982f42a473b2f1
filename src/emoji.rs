//! Emoji catalog
//!
//! Built from the `chat_emojis` event: base paths, then every group in
//! wire order, then every emoji filed under its group.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::adapter::{value_as_bool, value_as_i64, value_as_string, AdaptedEvent};
use crate::error::StateError;

/// A single emoji
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emoji {
    /// Text replaced by the picture
    pub placeholder: String,
    /// URL path relative to the default or custom base path
    pub path: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Provided by the service rather than uploaded by the chat owner
    pub is_default: bool,
    /// Usable by VIP users only
    pub vip: bool,
    /// Owning group
    pub group_id: i64,
}

/// A named group of emojis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmojiGroup {
    pub id: i64,
    pub name: String,
    /// Emojis keyed by placeholder
    pub emojis: IndexMap<String, Emoji>,
}

impl EmojiGroup {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            emojis: IndexMap::new(),
        }
    }

    pub fn get(&self, placeholder: &str) -> Option<&Emoji> {
        self.emojis.get(placeholder)
    }
}

/// All emoji groups of a chat plus the base paths their pictures live under
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmojiCatalog {
    pub default_path: Option<String>,
    pub custom_path: Option<String>,
    pub groups: Vec<EmojiGroup>,
}

impl EmojiCatalog {
    /// Build the catalog from an adapted `chat_emojis` event
    ///
    /// Groups are inserted before emojis; an emoji naming a group that is
    /// not in the payload is rejected.
    pub fn from_event(event: &AdaptedEvent) -> Result<Self, StateError> {
        let mut catalog = EmojiCatalog {
            default_path: event.get_string("default_path"),
            custom_path: event.get_string("custom_path"),
            groups: Vec::new(),
        };

        for raw in objects(event, "groups")? {
            let id = raw
                .get("id")
                .and_then(value_as_i64)
                .ok_or_else(|| event.invalid("groups"))?;
            let name = raw.get("t").and_then(value_as_string).unwrap_or_default();
            catalog.groups.push(EmojiGroup::new(id, name));
        }

        for raw in objects(event, "emojis")? {
            let emoji = emoji_from_raw(raw).ok_or_else(|| event.invalid("emojis"))?;
            let group = catalog
                .groups
                .iter_mut()
                .find(|group| group.id == emoji.group_id)
                .ok_or_else(|| StateError::EmojiGroupNotFound {
                    group_id: emoji.group_id,
                    placeholder: emoji.placeholder.clone(),
                })?;
            group.emojis.insert(emoji.placeholder.clone(), emoji);
        }

        Ok(catalog)
    }

    pub fn group(&self, id: i64) -> Option<&EmojiGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// Find an emoji by placeholder across all groups
    pub fn emoji(&self, placeholder: &str) -> Option<&Emoji> {
        self.groups.iter().find_map(|group| group.get(placeholder))
    }

    pub fn emoji_count(&self) -> usize {
        self.groups.iter().map(|group| group.emojis.len()).sum()
    }

    /// Full URL of an emoji picture
    pub fn url(&self, emoji: &Emoji) -> Option<String> {
        let base = if emoji.is_default {
            self.default_path.as_deref()
        } else {
            self.custom_path.as_deref()
        }?;
        Some(format!("{}{}", base, emoji.path))
    }
}

fn objects<'a>(
    event: &'a AdaptedEvent,
    field: &'static str,
) -> Result<Vec<&'a Map<String, Value>>, StateError> {
    match event.get(field) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_object().ok_or_else(|| event.invalid(field)))
            .collect(),
        Some(_) => Err(event.invalid(field)),
    }
}

fn emoji_from_raw(raw: &Map<String, Value>) -> Option<Emoji> {
    let dimension = |key: &str| {
        raw.get(key)
            .and_then(value_as_i64)
            .and_then(|v| u32::try_from(v).ok())
    };
    let flag = |key: &str| raw.get(key).and_then(value_as_bool);

    Some(Emoji {
        placeholder: raw.get("c").and_then(value_as_string)?,
        path: raw.get("i").and_then(value_as_string).unwrap_or_default(),
        width: dimension("w"),
        height: dimension("h"),
        is_default: flag("default").unwrap_or(true),
        vip: flag("p").unwrap_or(false),
        group_id: raw.get("s").and_then(value_as_i64)?,
    })
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
    fn test_catalog_preserves_group_order() {
        let catalog = EmojiCatalog::from_event(&adapt(json!({
            "t": "sl",
            "dp": "//st.chatovod.com/s/",
            "p": "//chat.chatovod.com/s/",
            "cats": [{"id": 2, "t": "G1"}, {"id": 1, "t": "G2"}],
            "smileys": [
                {"c": ":)", "i": "smile.png", "w": 20, "h": 20, "s": 1},
                {"c": ":cat:", "i": "cat.gif", "default": false, "p": true, "s": 2}
            ]
        })))
        .unwrap();

        let names: Vec<&str> = catalog.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["G1", "G2"]);
        assert_eq!(catalog.emoji_count(), 2);

        let smile = catalog.emoji(":)").unwrap();
        assert_eq!(smile.group_id, 1);
        assert_eq!(smile.width, Some(20));
        assert_eq!(
            catalog.url(smile).as_deref(),
            Some("//st.chatovod.com/s/smile.png")
        );

        let cat = catalog.group(2).unwrap().get(":cat:").unwrap();
        assert!(cat.vip);
        assert_eq!(
            catalog.url(cat).as_deref(),
            Some("//chat.chatovod.com/s/cat.gif")
        );
    }

    #[test]
    fn test_emoji_with_unknown_group_rejected() {
        let err = EmojiCatalog::from_event(&adapt(json!({
            "t": "sl",
            "dp": "/s/",
            "cats": [{"id": 1, "t": "G1"}],
            "smileys": [{"c": ":(", "i": "sad.png", "s": 9}]
        })))
        .unwrap_err();

        assert_eq!(
            err,
            StateError::EmojiGroupNotFound {
                group_id: 9,
                placeholder: ":(".to_string()
            }
        );
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = EmojiCatalog::from_event(&adapt(json!({"t": "sl"}))).unwrap();
        assert!(catalog.groups.is_empty());
        assert!(catalog.default_path.is_none());
    }
}
