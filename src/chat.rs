//! Chat session
//!
//! Ties the transport, the event adapter and the chat state together:
//! bootstrap the session, apply the startup snapshot, then long-poll for
//! live events. The session is owned by a single task; actions and polls
//! are interleaved by the owner.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::adapter::EventAdapter;
use crate::ban::{parse_ban_list, BanEntry};
use crate::config::ClientConfig;
use crate::error::{ChatError, ServiceError};
use crate::event::EventSink;
use crate::http::HttpClient;
use crate::registry::{kind, EventRegistry};
use crate::state::ChatState;
use crate::types::{MessageId, RoomId, Status};

/// Pause before rebinding after a transient failure
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// One connection to a chat
#[derive(Debug)]
pub struct Chat {
    config: ClientConfig,
    http: HttpClient,
    adapter: EventAdapter,
    state: ChatState,
}

impl Chat {
    /// Create a session using the built-in Chatovod event table
    pub fn new(config: ClientConfig) -> Result<Self, ChatError> {
        Self::with_registry(config, Arc::new(EventRegistry::chatovod()?))
    }

    /// Create a session sharing an existing registry
    pub fn with_registry(config: ClientConfig, registry: Arc<EventRegistry>) -> Result<Self, ChatError> {
        let http = HttpClient::new(&config)?;
        Ok(Self {
            config,
            http,
            adapter: EventAdapter::new(registry),
            state: ChatState::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Sign in to a Chatovod account before [`start`](Self::start)
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ChatError> {
        self.http.login(email, password).await
    }

    /// Bootstrap the session and apply the startup snapshot
    pub async fn start(&mut self, sink: &mut dyn EventSink) -> Result<(), ChatError> {
        self.http.fetch_session().await?;
        let snapshot = self.http.fetch_info().await?;
        info!(
            "Fetched {} snapshot events from {}",
            snapshot.len(),
            self.http.base_url()
        );

        self.state.apply_snapshot(&self.adapter, &snapshot, sink)?;
        self.sync_window_id();
        Ok(())
    }

    /// Run one long-poll bind and apply whatever it returned
    ///
    /// A bind that outlives the configured timeout counts as an empty
    /// batch. Returns the number of events received.
    pub async fn poll(&mut self, sink: &mut dyn EventSink) -> Result<usize, ChatError> {
        let events = match timeout(self.config.bind_timeout, self.http.bind()).await {
            Ok(events) => events?,
            Err(_) => {
                debug!("Bind timed out, rebinding");
                return Ok(0);
            }
        };

        let count = self.state.apply_batch(&self.adapter, &events, sink)?;
        self.sync_window_id();
        Ok(count)
    }

    /// Poll until the connection ends
    ///
    /// Transient transport failures are retried; connection errors and a
    /// closed state end the loop.
    pub async fn listen(&mut self, sink: &mut dyn EventSink) -> Result<(), ChatError> {
        loop {
            match self.poll(sink).await {
                Ok(_) => {}
                Err(e) if e.is_connection() || !self.state.is_ready() => {
                    error!("Event stream ended: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Bind failed, retrying: {}", e);
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    /// Sign in to the chat under `nickname`
    pub async fn enter(&self, nickname: &str) -> Result<(), ChatError> {
        let events = self.http.enter_chat(nickname, self.config.message_limit).await?;
        self.check_action(&events)?;
        info!("Entered chat as {}", nickname);
        Ok(())
    }

    pub async fn leave(&self) -> Result<(), ChatError> {
        let events = self.http.leave_chat().await?;
        self.check_action(&events)
    }

    pub async fn send_message(&self, room_id: RoomId, content: &str) -> Result<(), ChatError> {
        let events = self.http.send_message(room_id, content).await?;
        self.check_action(&events)
    }

    pub async fn open_room(&self, room_id: RoomId) -> Result<(), ChatError> {
        let events = self.http.open_room(room_id).await?;
        self.check_action(&events)
    }

    pub async fn open_private(&self, nickname: &str) -> Result<(), ChatError> {
        let events = self.http.open_private(nickname).await?;
        self.check_action(&events)
    }

    pub async fn close_room(&self, room_id: RoomId) -> Result<(), ChatError> {
        let events = self.http.close_room(room_id).await?;
        self.check_action(&events)
    }

    pub async fn read_messages(&self, room_id: RoomId) -> Result<(), ChatError> {
        let events = self.http.read_messages(room_id).await?;
        self.check_action(&events)
    }

    /// Load older messages of a room and apply them like live events
    pub async fn fetch_messages(
        &mut self,
        room_id: RoomId,
        sink: &mut dyn EventSink,
    ) -> Result<usize, ChatError> {
        let events = self.http.fetch_messages(room_id).await?;
        self.state.apply_batch(&self.adapter, &events, sink)
    }

    /// Load the list of public rooms and apply the returned events
    pub async fn load_rooms(&mut self, sink: &mut dyn EventSink) -> Result<usize, ChatError> {
        let events = self.http.fetch_rooms().await?;
        self.state.apply_batch(&self.adapter, &events, sink)
    }

    /// Request moderation details for a nickname; they arrive as a
    /// [`ChatEvent::ModerationInfo`](crate::event::ChatEvent::ModerationInfo)
    pub async fn moderation_info(
        &mut self,
        nickname: &str,
        room_id: Option<RoomId>,
        sink: &mut dyn EventSink,
    ) -> Result<usize, ChatError> {
        let events = self.http.fetch_moderation_info(nickname, room_id).await?;
        self.state.apply_batch(&self.adapter, &events, sink)
    }

    pub async fn nickname_info(
        &mut self,
        nicknames: &[&str],
        sink: &mut dyn EventSink,
    ) -> Result<usize, ChatError> {
        let events = self.http.fetch_nickname_info(nicknames).await?;
        self.check_action(&events)?;
        self.state.apply_batch(&self.adapter, &events, sink)
    }

    pub async fn set_status(&self, status: Status) -> Result<(), ChatError> {
        let events = self.http.set_status(status).await?;
        self.check_action(&events)
    }

    /// Ban a nickname, chat-wide when `room_id` is `None`
    pub async fn ban(
        &self,
        nickname: &str,
        room_id: Option<RoomId>,
        minutes: Option<u32>,
        comment: Option<&str>,
    ) -> Result<(), ChatError> {
        let events = self.http.ban(nickname, room_id, minutes, comment).await?;
        self.check_action(&events)
    }

    pub async fn unban(&self, entries: &[u64]) -> Result<(), ChatError> {
        let events = self.http.unban(entries).await?;
        self.check_action(&events)
    }

    /// Current ban list
    pub async fn bans(&self) -> Result<Vec<BanEntry>, ChatError> {
        let html = self.http.fetch_bans().await?;
        Ok(parse_ban_list(&html))
    }

    /// Queue a message for deletion; sent by [`flush_deletions`](Self::flush_deletions)
    pub fn delete_later(&mut self, room_id: RoomId, message_id: MessageId) -> Result<(), ChatError> {
        Ok(self.state.queue_deletion(room_id, message_id)?)
    }

    /// Send every queued deletion, one request per room
    ///
    /// Returns the number of messages deleted. On failure the rooms not
    /// yet deleted, including the failing one, go back to the queue.
    pub async fn flush_deletions(&mut self) -> Result<usize, ChatError> {
        let mut groups = group_by_room(self.state.take_pending_deletions()).into_iter();
        let mut deleted = 0;

        while let Some((room_id, messages)) = groups.next() {
            debug!("Deleting {} messages in room {}", messages.len(), room_id);
            let result = match self.http.delete_messages(room_id, &messages).await {
                Ok(events) => self.check_action(&events),
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                let unsent = std::iter::once((room_id, messages))
                    .chain(groups)
                    .flat_map(|(room_id, messages)| {
                        messages.into_iter().map(move |message_id| (room_id, message_id))
                    })
                    .collect();
                self.state.requeue_deletions(unsent);
                return Err(e);
            }

            deleted += messages.len();
        }

        Ok(deleted)
    }

    /// Leave the chat if signed in and close the state
    pub async fn close(&mut self) -> Result<(), ChatError> {
        let result = if self.state.session().signed_in && self.state.is_ready() {
            self.leave().await
        } else {
            Ok(())
        };
        self.state.close();
        result
    }

    /// Fail with the first `error` event an action response carries
    fn check_action(&self, events: &[Value]) -> Result<(), ChatError> {
        for raw in events {
            match self.adapter.adapt(raw) {
                Ok(event) if event.event_type() == kind::ERROR => {
                    return Err(ServiceError::from_event(&event).into());
                }
                Ok(_) => {}
                Err(e) => debug!("Ignoring action response event ({}): {}", e, raw),
            }
        }
        Ok(())
    }

    fn sync_window_id(&mut self) {
        let window_id = self.state.session().window_id;
        if self.http.window_id() != window_id {
            self.http.set_window_id(window_id);
        }
    }
}

/// Group queued deletions by room, keeping queue order
fn group_by_room(pending: Vec<(RoomId, MessageId)>) -> IndexMap<RoomId, Vec<MessageId>> {
    let mut grouped: IndexMap<RoomId, Vec<MessageId>> = IndexMap::new();
    for (room_id, message_id) in pending {
        grouped.entry(room_id).or_default().push(message_id);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChatEvent;
    use crate::state::Phase;
    use serde_json::json;

    fn chat() -> Chat {
        Chat::new(ClientConfig::for_chat("mychat")).unwrap()
    }

    fn ready_chat() -> Chat {
        let mut chat = chat();
        let mut sink: Vec<ChatEvent> = Vec::new();
        chat.state
            .apply_snapshot(
                &chat.adapter,
                &[
                    json!({"t": "so", "k": "wid", "v": 7}),
                    json!({"t": "ro", "r": 42, "title": "Hall"}),
                ],
                &mut sink,
            )
            .unwrap();
        chat.sync_window_id();
        chat
    }

    #[test]
    fn test_window_id_synced_from_state() {
        let chat = ready_chat();
        assert_eq!(chat.http().window_id(), Some(7));
        assert_eq!(chat.state().room_count(), 1);
    }

    #[test]
    fn test_check_action_errors() {
        let chat = chat();

        assert!(chat.check_action(&[]).is_ok());
        assert!(chat
            .check_action(&[json!({"t": "ro", "r": 1}), json!("ok")])
            .is_ok());

        let err = chat
            .check_action(&[json!({
                "t": "error",
                "et": "auth",
                "est": "alreadySignedIn",
                "error": "taken"
            })])
            .unwrap_err();
        assert!(matches!(
            err,
            ChatError::Service(ServiceError::UnavailableName { .. })
        ));
    }

    #[test]
    fn test_delete_later_queues() {
        let mut chat = ready_chat();
        chat.delete_later(RoomId(42), MessageId(1)).unwrap();
        chat.delete_later(RoomId(42), MessageId(2)).unwrap();
        assert_eq!(chat.state().pending_deletions().len(), 2);
    }

    #[test]
    fn test_group_by_room() {
        let grouped = group_by_room(vec![
            (RoomId(2), MessageId(10)),
            (RoomId(1), MessageId(11)),
            (RoomId(2), MessageId(12)),
        ]);

        let rooms: Vec<RoomId> = grouped.keys().copied().collect();
        assert_eq!(rooms, vec![RoomId(2), RoomId(1)]);
        assert_eq!(grouped[&RoomId(2)], vec![MessageId(10), MessageId(12)]);
    }

    #[tokio::test]
    async fn test_close_without_sign_in() {
        let mut chat = ready_chat();
        chat.delete_later(RoomId(42), MessageId(1)).unwrap();

        chat.close().await.unwrap();

        assert_eq!(chat.state().phase(), Phase::Closed);
        assert!(chat.state().pending_deletions().is_empty());
        assert!(chat.delete_later(RoomId(42), MessageId(2)).is_err());
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_deletions() {
        let config = ClientConfig::custom_host("127.0.0.1:1").with_secure(false);
        let mut chat = Chat::new(config).unwrap();
        let mut sink: Vec<ChatEvent> = Vec::new();
        chat.state
            .apply_snapshot(&chat.adapter, &[json!({"t": "so", "k": "wid", "v": 1})], &mut sink)
            .unwrap();

        chat.delete_later(RoomId(1), MessageId(10)).unwrap();
        chat.delete_later(RoomId(2), MessageId(20)).unwrap();

        assert!(chat.flush_deletions().await.is_err());
        assert_eq!(
            chat.state().pending_deletions(),
            &[(RoomId(1), MessageId(10)), (RoomId(2), MessageId(20))]
        );
    }

    #[tokio::test]
    async fn test_flush_without_pending_deletions() {
        let mut chat = ready_chat();
        assert_eq!(chat.flush_deletions().await.unwrap(), 0);
    }
}
