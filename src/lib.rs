//! Chatovod Chat Client Library
//!
//! An asynchronous client for Chatovod chats built on reqwest and tokio.
//! Wire events from the long-poll API are renamed into readable fields by
//! an event registry, then folded into an in-memory chat state.
//!
//! # Features
//! - Event registry mapping terse wire keys to descriptive names
//! - Chat state reducer for users, rooms, emojis and session options
//! - Long-poll event stream with typed chat events
//! - Account login, chat actions and batched message deletion
//! - Ban list parsing
//!
//! # Architecture
//! - `EventRegistry` + `EventAdapter` turn raw JSON into `AdaptedEvent`s
//! - `ChatState` applies adapted events and emits `ChatEvent`s to an `EventSink`
//! - `Chat` owns the HTTP transport and the state, driven by one task
//!
//! # Example
//! ```ignore
//! use chatovod::{Chat, ChatEvent, ClientConfig};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chatovod::ChatError> {
//!     let (mut tx, mut rx) = mpsc::unbounded_channel::<ChatEvent>();
//!     tokio::spawn(async move {
//!         while let Some(event) = rx.recv().await {
//!             println!("{:?}", event);
//!         }
//!     });
//!
//!     let mut chat = Chat::new(ClientConfig::for_chat("mychat"))?;
//!     chat.start(&mut tx).await?;
//!     chat.listen(&mut tx).await
//! }
//! ```

pub mod adapter;
pub mod ban;
pub mod chat;
pub mod config;
pub mod emoji;
pub mod error;
pub mod event;
pub mod http;
pub mod message;
pub mod registry;
pub mod room;
pub mod state;
pub mod time;
pub mod types;
pub mod user;

// Re-export main types for convenience
pub use adapter::{AdaptedEvent, EventAdapter};
pub use ban::{parse_ban_list, BanEntry};
pub use chat::Chat;
pub use config::ClientConfig;
pub use emoji::{Emoji, EmojiCatalog, EmojiGroup};
pub use error::{AdaptError, ChatError, RegistryError, ServiceError, StateError};
pub use event::{ChatEvent, EventSink};
pub use http::HttpClient;
pub use message::Message;
pub use registry::{EventDescriptor, EventRegistry};
pub use room::Room;
pub use state::{ChatState, Phase, SessionInfo};
pub use types::{Gender, Group, MessageId, RoomId, RoomType, Status};
pub use user::User;
