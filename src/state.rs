//! Chat state reducer
//!
//! Folds adapted events into the session aggregate: users, rooms, the
//! emoji catalog and session options. One task owns the state and feeds
//! it batch by batch, so no locking is involved.
//!
//! Lifecycle: `Uninitialized` → `Ready` (startup snapshot applied) →
//! `Closed` (teardown or fatal connection error).

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::adapter::{value_as_i64, AdaptedEvent, EventAdapter};
use crate::emoji::{Emoji, EmojiCatalog, EmojiGroup};
use crate::error::{AdaptError, ChatError, ServiceError, StateError};
use crate::event::{ChatEvent, EventSink};
use crate::message::Message;
use crate::registry::kind;
use crate::room::Room;
use crate::types::{AccountService, MessageId, RoomId};
use crate::user::{nickname_key, User};

/// Lifecycle phase of a [`ChatState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Ready,
    Closed,
}

/// Account details sent in the `cls` event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountInfo {
    pub email: Option<String>,
    pub service: AccountService,
    pub group: Option<String>,
    pub last_nickname: Option<String>,
}

/// Options set by the service for this session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionInfo {
    /// Nickname the session is signed in with
    pub nickname: Option<String>,
    pub signed_in: bool,
    /// Window id to send with chat requests
    pub window_id: Option<i64>,
    pub account: Option<AccountInfo>,
}

/// In-memory aggregate of one chat session
#[derive(Debug)]
pub struct ChatState {
    phase: Phase,
    session: SessionInfo,
    /// Users keyed by case-folded nickname, in arrival order
    users: IndexMap<String, User>,
    /// Open rooms, in opening order
    rooms: IndexMap<RoomId, Room>,
    emojis: EmojiCatalog,
    /// Messages queued for one batched delete request
    pending_deletions: Vec<(RoomId, MessageId)>,
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            session: SessionInfo::default(),
            users: IndexMap::new(),
            rooms: IndexMap::new(),
            emojis: EmojiCatalog::default(),
            pending_deletions: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Apply the startup snapshot
    ///
    /// Events are applied in order. Unregistered or malformed events are
    /// logged and skipped, as are events failing a data-integrity check.
    /// Connection errors reported in the snapshot abort it and close the state.
    pub fn apply_snapshot(
        &mut self,
        adapter: &EventAdapter,
        raw_events: &[Value],
        sink: &mut dyn EventSink,
    ) -> Result<(), ChatError> {
        match self.phase {
            Phase::Uninitialized => {}
            Phase::Ready => return Err(StateError::AlreadyInitialized.into()),
            Phase::Closed => return Err(StateError::Closed.into()),
        }

        for raw in raw_events {
            self.apply_raw(adapter, raw, sink)?;
        }

        self.phase = Phase::Ready;
        info!(
            "Chat state ready: {} users, {} rooms, {} emoji groups",
            self.users.len(),
            self.rooms.len(),
            self.emojis.groups.len()
        );
        Ok(())
    }

    /// Apply one batch of live events from a bind response
    ///
    /// Same tolerance as [`apply_snapshot`](Self::apply_snapshot). Returns
    /// the number of events in the batch.
    pub fn apply_batch(
        &mut self,
        adapter: &EventAdapter,
        raw_events: &[Value],
        sink: &mut dyn EventSink,
    ) -> Result<usize, ChatError> {
        self.ensure_ready()?;

        for raw in raw_events {
            self.apply_raw(adapter, raw, sink)?;
        }

        Ok(raw_events.len())
    }

    /// Apply a single adapted live event, propagating every failure
    pub fn apply_event(
        &mut self,
        event: &AdaptedEvent,
        sink: &mut dyn EventSink,
    ) -> Result<(), ChatError> {
        self.ensure_ready()?;
        self.dispatch(event, sink)
    }

    /// Tear down the state; only `close` is valid afterwards
    pub fn close(&mut self) {
        if self.phase != Phase::Closed {
            info!("Chat state closed");
        }
        self.phase = Phase::Closed;
        self.pending_deletions.clear();
    }

    /// Queue a message for the next batched delete
    pub fn queue_deletion(&mut self, room_id: RoomId, message_id: MessageId) -> Result<(), StateError> {
        if self.phase == Phase::Closed {
            return Err(StateError::Closed);
        }
        self.pending_deletions.push((room_id, message_id));
        Ok(())
    }

    pub fn pending_deletions(&self) -> &[(RoomId, MessageId)] {
        &self.pending_deletions
    }

    /// Drain the deletion queue
    pub fn take_pending_deletions(&mut self) -> Vec<(RoomId, MessageId)> {
        std::mem::take(&mut self.pending_deletions)
    }

    /// Put back deletions that were taken but not sent, ahead of anything
    /// queued since
    pub fn requeue_deletions(&mut self, mut unsent: Vec<(RoomId, MessageId)>) {
        if self.phase == Phase::Closed {
            warn!("State closed, dropping {} unsent deletions", unsent.len());
            return;
        }
        unsent.append(&mut self.pending_deletions);
        self.pending_deletions = unsent;
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// Look up a user by nickname (case-insensitive)
    pub fn get_user(&self, nickname: &str) -> Option<&User> {
        self.users.get(&nickname_key(nickname))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn get_room(&self, room_id: impl Into<RoomId>) -> Option<&Room> {
        self.rooms.get(&room_id.into())
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn emoji_groups(&self) -> &[EmojiGroup] {
        &self.emojis.groups
    }

    pub fn emoji_default_path(&self) -> Option<&str> {
        self.emojis.default_path.as_deref()
    }

    pub fn emoji_custom_path(&self) -> Option<&str> {
        self.emojis.custom_path.as_deref()
    }

    pub fn emoji(&self, placeholder: &str) -> Option<&Emoji> {
        self.emojis.emoji(placeholder)
    }

    pub fn emoji_catalog(&self) -> &EmojiCatalog {
        &self.emojis
    }

    fn ensure_ready(&self) -> Result<(), StateError> {
        match self.phase {
            Phase::Ready => Ok(()),
            Phase::Uninitialized => Err(StateError::NotReady),
            Phase::Closed => Err(StateError::Closed),
        }
    }

    /// Adapt and dispatch one raw event, skipping what the stream may
    /// legitimately carry but this client cannot use
    fn apply_raw(
        &mut self,
        adapter: &EventAdapter,
        raw: &Value,
        sink: &mut dyn EventSink,
    ) -> Result<(), ChatError> {
        let event = match adapter.adapt(raw) {
            Ok(event) => event,
            Err(AdaptError::EventNotRegistered(wire_type)) => {
                warn!("Skipping unregistered event '{}': {}", wire_type, raw);
                return Ok(());
            }
            Err(e) => {
                warn!("Skipping malformed event ({}): {}", e, raw);
                return Ok(());
            }
        };

        match self.dispatch(&event, sink) {
            Err(ChatError::State(e)) if e.is_data_integrity() => {
                error!("Dropping '{}' event: {}", event.event_type(), e);
                Ok(())
            }
            other => other,
        }
    }

    /// Route an adapted event to its handler
    fn dispatch(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), ChatError> {
        debug!("Applying '{}' event", event.event_type());

        match event.event_type() {
            kind::SET_OPTION => self.handle_set_option(event)?,
            kind::ACCOUNT_INFO => self.handle_account_info(event),
            kind::CHAT_EMOJIS => self.handle_chat_emojis(event)?,
            kind::ERROR => self.handle_error(event, sink)?,
            kind::ROOM_OPEN => self.handle_room_open(event, sink)?,
            kind::ROOM_UPDATE => self.handle_room_update(event, sink)?,
            kind::ROOM_CLOSE => self.handle_room_close(event, sink)?,
            kind::ROOM_CLEAR => sink.dispatch(ChatEvent::RoomCleared {
                room_id: event.get_i64("room_id").map(RoomId),
                scope: event.get_string("scope"),
            }),
            kind::USER_ENTER => self.handle_user_enter(event, sink)?,
            kind::USER_LEAVE => self.handle_user_leave(event, sink)?,
            kind::USER_ENTER_ROOM => sink.dispatch(ChatEvent::UserEnteredRoom {
                room_id: event.get_i64("room_id").map(RoomId),
                nickname: event.get_string("nickname"),
            }),
            kind::USER_LEAVE_ROOM => sink.dispatch(ChatEvent::UserLeftRoom {
                room_id: event.get_i64("room_id").map(RoomId),
                nickname: event.get_string("nickname"),
            }),
            kind::USER_BAN => sink.dispatch(ChatEvent::UserBanned {
                room_id: event.get_i64("room_id").map(RoomId),
                nickname: event.get_string("nickname"),
                author: event.get_string("author"),
                duration: event.get_i64("duration"),
                comment: event.get_string("comment"),
            }),
            kind::MESSAGE => self.handle_message(event, sink)?,
            kind::MESSAGE_DELETE => self.handle_message_delete(event, sink)?,
            kind::MESSAGE_READ => sink.dispatch(ChatEvent::MessagesRead {
                room_id: event.get_i64("room_id").map(RoomId),
                since: event.get_i64("since"),
                until: event.get_i64("until"),
            }),
            kind::HAS_OLDER_EVENTS => sink.dispatch(ChatEvent::HasOlderEvents {
                room_id: event.get_i64("room_id").map(RoomId),
                value: event.get_bool("value").unwrap_or(false),
            }),
            kind::MODERATION_INFO => sink.dispatch(ChatEvent::ModerationInfo {
                info: event.as_map().clone(),
            }),
            kind::ROOM_COUNT => sink.dispatch(ChatEvent::RoomCount {
                count: event.require_i64("count")?,
            }),
            kind::TAB_ACTIVATE => sink.dispatch(ChatEvent::TabActivated {
                room_id: event.get_i64("room_id").map(RoomId),
                scope: event.get_string("scope"),
            }),
            kind::HEARTBEAT | kind::TRY_AUTO_LOGIN => {}
            other => debug!("No handler for '{}' event", other),
        }

        Ok(())
    }

    fn handle_set_option(&mut self, event: &AdaptedEvent) -> Result<(), StateError> {
        let option = event.require_string("option")?;
        let value = event.get("value");

        match option.as_str() {
            "nick" => {
                self.session.nickname = event.get_string("value");
                info!("Signed in as {:?}", self.session.nickname);
            }
            "signedIn" => self.session.signed_in = event.get_bool("value").unwrap_or(false),
            "wid" => {
                let window_id = value.and_then(value_as_i64).ok_or_else(|| event.invalid("value"))?;
                self.session.window_id = Some(window_id);
            }
            _ => info!("Unhandled option '{}': {:?}", option, value),
        }
        Ok(())
    }

    fn handle_account_info(&mut self, event: &AdaptedEvent) {
        self.session.account = Some(AccountInfo {
            email: event.get_string("email"),
            service: AccountService::from_wire(event.get("account_type")),
            group: event.get_string("user_group"),
            last_nickname: event.get_string("last_nickname"),
        });
    }

    fn handle_chat_emojis(&mut self, event: &AdaptedEvent) -> Result<(), StateError> {
        // Built aside so a rejected payload leaves the previous catalog intact
        let catalog = EmojiCatalog::from_event(event)?;
        debug!(
            "Loaded {} emojis in {} groups",
            catalog.emoji_count(),
            catalog.groups.len()
        );
        self.emojis = catalog;
        Ok(())
    }

    fn handle_error(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), ChatError> {
        let err = ServiceError::from_event(event);
        if err.is_connection() {
            warn!("Service reported connection error, closing: {}", err);
            self.phase = Phase::Closed;
            return Err(err.into());
        }

        warn!("Service reported error: {}", err);
        sink.dispatch(ChatEvent::Error { error: err });
        Ok(())
    }

    fn handle_room_open(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), StateError> {
        let room_id = RoomId(event.require_i64("room_id")?);

        match self.rooms.get_mut(&room_id) {
            Some(room) => room.update(event),
            None => {
                let room = Room::from_event(event)?;
                info!("Room {} opened ({})", room_id, room.display_name());
                self.rooms.insert(room_id, room);
            }
        }

        sink.dispatch(ChatEvent::RoomOpened {
            room_id,
            focus: event.get_bool("set_focus").unwrap_or(false),
        });
        Ok(())
    }

    fn handle_room_update(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), StateError> {
        let room_id = RoomId(event.require_i64("room_id")?);
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(StateError::RoomNotFound(room_id))?;

        room.update(event);
        sink.dispatch(ChatEvent::RoomUpdated { room_id });
        Ok(())
    }

    fn handle_room_close(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), StateError> {
        let room_id = RoomId(event.require_i64("room_id")?);

        if self.rooms.shift_remove(&room_id).is_some() {
            info!("Room {} closed", room_id);
            sink.dispatch(ChatEvent::RoomClosed { room_id });
        } else {
            debug!("Room {} already closed", room_id);
        }
        Ok(())
    }

    fn handle_user_enter(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), StateError> {
        let user = User::from_event(event)?;
        let nickname = user.nickname.clone();

        debug!("User '{}' entered", nickname);
        self.users.insert(user.key(), user);
        sink.dispatch(ChatEvent::UserEntered { nickname });
        Ok(())
    }

    fn handle_user_leave(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), StateError> {
        let nickname = event.require_string("nickname")?;

        match self.users.shift_remove(&nickname_key(&nickname)) {
            Some(user) => {
                debug!("User '{}' left", user.nickname);
                sink.dispatch(ChatEvent::UserLeft {
                    nickname: user.nickname,
                });
            }
            None => debug!("User '{}' already gone", nickname),
        }
        Ok(())
    }

    fn handle_message(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), StateError> {
        let mut message = Message::from_event(event)?;

        message.author_id = self.get_user(&message.author).and_then(|user| user.id);
        if !self.rooms.contains_key(&message.room_id) {
            debug!("Message {} for room {} which is not open", message.id, message.room_id);
        }

        sink.dispatch(ChatEvent::Message { message });
        Ok(())
    }

    fn handle_message_delete(&mut self, event: &AdaptedEvent, sink: &mut dyn EventSink) -> Result<(), StateError> {
        let room_id = RoomId(event.require_i64("room_id")?);
        let messages = match event.get("messages") {
            Some(Value::Array(items)) => items.iter().filter_map(value_as_i64).map(MessageId).collect(),
            Some(Value::String(list)) => list
                .split(',')
                .filter_map(|id| id.trim().parse().ok())
                .map(MessageId)
                .collect(),
            Some(other) => value_as_i64(other).map(MessageId).into_iter().collect(),
            None => return Err(event.missing("messages")),
        };

        sink.dispatch(ChatEvent::MessagesDeleted { room_id, messages });
        Ok(())
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}
