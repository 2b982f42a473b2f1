//! HTTP transport for the Chatovod chat API
//!
//! Thin wrapper over `reqwest` holding the session cookies, CSRF token and
//! window id every chat request needs. Responses are returned as raw wire
//! events; adapting and reducing them is up to the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, Response, Url};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ChatError, ServiceError};
use crate::types::{MessageId, RoomId, Status};

/// Timeout for establishing a connection (long-poll requests are bounded
/// separately by the caller)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Base URL of the account service
pub const ACCOUNT_BASE: &str = "https://account.chatovod.com";

/// Cookie carrying the CSRF token
const CSRF_COOKIE: &str = "csrf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Head,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Head => Method::HEAD,
        }
    }
}

/// Which service an endpoint lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// The chat itself (`<name>.chatovod.com`)
    Chat,
    /// The shared account service
    Account,
}

/// One API route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub host: Host,
    pub path: &'static str,
}

impl Endpoint {
    const fn chat(method: HttpMethod, path: &'static str) -> Self {
        Self {
            method,
            host: Host::Chat,
            path,
        }
    }

    const fn account(method: HttpMethod, path: &'static str) -> Self {
        Self {
            method,
            host: Host::Account,
            path,
        }
    }
}

/// Account and chat API routes
pub mod endpoints {
    use super::Endpoint;
    use super::HttpMethod::{Get, Head, Post};

    // Account
    pub const LOGIN_PAGE: Endpoint = Endpoint::account(Head, "/u/login");
    pub const LOGIN: Endpoint = Endpoint::account(Post, "/u/login.do");
    pub const LOGOUT: Endpoint = Endpoint::account(Get, "/u/logout");

    // Chat
    pub const CHAT_SESSION_FETCH: Endpoint = Endpoint::chat(Head, "/");
    pub const CHAT_INFO_FETCH: Endpoint = Endpoint::chat(Get, "/chat/start");
    pub const CHAT_BIND: Endpoint = Endpoint::chat(Get, "/chat/bind");
    pub const CHAT_BANS_FETCH: Endpoint = Endpoint::chat(Get, "/chat/load/banlist");
    pub const CHAT_ROOMS_FETCH: Endpoint = Endpoint::chat(Get, "/chat/load/rooms");

    // Chat - nickname
    pub const NICKNAME_BAN: Endpoint = Endpoint::chat(Post, "/chat/ban");
    pub const NICKNAME_UNBAN: Endpoint = Endpoint::chat(Post, "/chat/unban");
    pub const NICKNAME_MODERATE: Endpoint = Endpoint::chat(Get, "/chat/getChatNickLocalModInfo");
    pub const NICKNAME_FETCH: Endpoint = Endpoint::chat(Post, "/chat/getChatNickLocal");

    // Room
    pub const ROOM_OPEN: Endpoint = Endpoint::chat(Post, "/chat/openRoom");
    pub const ROOM_PRIVATE_OPEN: Endpoint = Endpoint::chat(Post, "/chat/openPrivate2");
    pub const ROOM_CLOSE: Endpoint = Endpoint::chat(Post, "/chat/closeRoom");
    pub const ROOM_MESSAGE_SEND: Endpoint = Endpoint::chat(Post, "/chat/send");
    pub const ROOM_MESSAGES_READ: Endpoint = Endpoint::chat(Post, "/chat/markChannelRead");
    pub const ROOM_MESSAGES_DELETE: Endpoint = Endpoint::chat(Post, "/chat/deleteMessages");
    pub const ROOM_MESSAGES_FETCH: Endpoint = Endpoint::chat(Get, "/chat/loadLastMessages");

    // User
    pub const USER_CHAT_ENTER: Endpoint = Endpoint::chat(Post, "/chat/auth");
    pub const USER_CHAT_LEAVE: Endpoint = Endpoint::chat(Get, "/chat/signOut");
    pub const USER_STATUS_SET: Endpoint = Endpoint::chat(Post, "/chat/setStatus");
}

type Params = Vec<(&'static str, String)>;

/// HTTP client bound to one chat
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    cookies: Arc<Jar>,
    base_url: String,
    csrf_token: Option<String>,
    window_id: Option<i64>,
}

impl HttpClient {
    /// Create a client for the chat described by `config`
    pub fn new(config: &ClientConfig) -> Result<Self, ChatError> {
        let cookies = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .user_agent(config.user_agent.clone())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            cookies,
            base_url: config.base_url(),
            csrf_token: None,
            window_id: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn window_id(&self) -> Option<i64> {
        self.window_id
    }

    /// Window id assigned by the service (`wid` option)
    pub fn set_window_id(&mut self, window_id: Option<i64>) {
        self.window_id = window_id;
    }

    /// Absolute URL of an endpoint
    pub fn url_for(&self, endpoint: &Endpoint) -> String {
        match endpoint.host {
            Host::Chat => format!("{}{}", self.base_url, endpoint.path),
            Host::Account => format!("{}{}", ACCOUNT_BASE, endpoint.path),
        }
    }

    /// Sign in to a Chatovod account
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ChatError> {
        self.send(endpoints::LOGIN_PAGE, &[], None).await?;

        let form = [("login", email.to_string()), ("password", password.to_string())];
        let response = self.send(endpoints::LOGIN, &[], Some(&form)).await?;

        // A failed login lands back on the login form
        let path = response.url().path();
        if path == endpoints::LOGIN_PAGE.path || path == endpoints::LOGIN.path {
            return Err(ServiceError::InvalidLogin.into());
        }

        info!("Logged in to account {}", email);
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ChatError> {
        self.send(endpoints::LOGOUT, &[], None).await?;
        Ok(())
    }

    /// Open the chat page to obtain session cookies and the CSRF token
    pub async fn fetch_session(&mut self) -> Result<(), ChatError> {
        self.send(endpoints::CHAT_SESSION_FETCH, &[], None).await?;

        let url = Url::parse(&self.base_url).map_err(|e| ChatError::Config(e.to_string()))?;
        self.csrf_token = self
            .cookies
            .cookies(&url)
            .and_then(|header| header.to_str().ok().and_then(|h| cookie_value(h, CSRF_COOKIE)));

        debug!("Session established (csrf token: {})", self.csrf_token.is_some());
        Ok(())
    }

    /// Startup snapshot: the events describing the current chat
    pub async fn fetch_info(&self) -> Result<Vec<Value>, ChatError> {
        let response = self.send(endpoints::CHAT_INFO_FETCH, &[], None).await?;
        Ok(parse_events(&response.text().await?)?)
    }

    /// One long-poll bind; blocks server-side until events are available
    pub async fn bind(&self) -> Result<Vec<Value>, ChatError> {
        let query = self.session_params(Vec::new());
        let response = self.send(endpoints::CHAT_BIND, &query, None).await?;
        Ok(parse_events(&response.text().await?)?)
    }

    /// HTML ban list
    pub async fn fetch_bans(&self) -> Result<String, ChatError> {
        let response = self.send(endpoints::CHAT_BANS_FETCH, &[], None).await?;
        Ok(response.text().await?)
    }

    pub async fn fetch_rooms(&self) -> Result<Vec<Value>, ChatError> {
        let response = self.send(endpoints::CHAT_ROOMS_FETCH, &[], None).await?;
        Ok(parse_events(&response.text().await?)?)
    }

    /// Sign in to the chat under a nickname
    pub async fn enter_chat(&self, nickname: &str, limit: u32) -> Result<Vec<Value>, ChatError> {
        let form = self.session_params(vec![("nick", nickname.to_string()), ("limit", limit.to_string())]);
        self.action(endpoints::USER_CHAT_ENTER, form).await
    }

    pub async fn leave_chat(&self) -> Result<Vec<Value>, ChatError> {
        let query = self.session_params(Vec::new());
        let response = self.send(endpoints::USER_CHAT_LEAVE, &query, None).await?;
        Ok(parse_action_events(&response.text().await?))
    }

    pub async fn open_room(&self, room_id: RoomId) -> Result<Vec<Value>, ChatError> {
        let form = self.session_params(vec![("roomId", room_id.to_string())]);
        self.action(endpoints::ROOM_OPEN, form).await
    }

    /// Open a private conversation with a user
    pub async fn open_private(&self, nickname: &str) -> Result<Vec<Value>, ChatError> {
        let form = self.session_params(vec![("nick", nickname.to_string())]);
        self.action(endpoints::ROOM_PRIVATE_OPEN, form).await
    }

    pub async fn close_room(&self, room_id: RoomId) -> Result<Vec<Value>, ChatError> {
        let form = self.session_params(vec![("roomId", room_id.to_string())]);
        self.action(endpoints::ROOM_CLOSE, form).await
    }

    pub async fn send_message(&self, room_id: RoomId, content: &str) -> Result<Vec<Value>, ChatError> {
        let form = self.session_params(vec![
            ("roomId", room_id.to_string()),
            ("msg", content.to_string()),
        ]);
        self.action(endpoints::ROOM_MESSAGE_SEND, form).await
    }

    pub async fn read_messages(&self, room_id: RoomId) -> Result<Vec<Value>, ChatError> {
        let form = self.session_params(vec![("roomId", room_id.to_string())]);
        self.action(endpoints::ROOM_MESSAGES_READ, form).await
    }

    /// Delete several messages of one room in a single request
    pub async fn delete_messages(
        &self,
        room_id: RoomId,
        messages: &[MessageId],
    ) -> Result<Vec<Value>, ChatError> {
        let form = self.session_params(vec![
            ("roomId", room_id.to_string()),
            ("messages", join_ids(messages)),
        ]);
        self.action(endpoints::ROOM_MESSAGES_DELETE, form).await
    }

    /// Older messages of a room (answered as wire events)
    pub async fn fetch_messages(&self, room_id: RoomId) -> Result<Vec<Value>, ChatError> {
        let query = self.session_params(vec![("roomId", room_id.to_string())]);
        let response = self.send(endpoints::ROOM_MESSAGES_FETCH, &query, None).await?;
        Ok(parse_events(&response.text().await?)?)
    }

    pub async fn ban(
        &self,
        nickname: &str,
        room_id: Option<RoomId>,
        minutes: Option<u32>,
        comment: Option<&str>,
    ) -> Result<Vec<Value>, ChatError> {
        let mut params = vec![("nick", nickname.to_string())];
        if let Some(room_id) = room_id {
            params.push(("roomId", room_id.to_string()));
        }
        if let Some(minutes) = minutes {
            params.push(("minutes", minutes.to_string()));
        }
        if let Some(comment) = comment {
            params.push(("comment", comment.to_string()));
        }
        self.action(endpoints::NICKNAME_BAN, self.session_params(params))
            .await
    }

    /// Lift bans by ban entry id
    pub async fn unban(&self, entries: &[u64]) -> Result<Vec<Value>, ChatError> {
        let entries = entries
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let form = self.session_params(vec![("entries", entries)]);
        self.action(endpoints::NICKNAME_UNBAN, form).await
    }

    /// Moderation details for a nickname (answered as a `mi` event)
    pub async fn fetch_moderation_info(
        &self,
        nickname: &str,
        room_id: Option<RoomId>,
    ) -> Result<Vec<Value>, ChatError> {
        let query = moderation_query(nickname, room_id);
        let response = self.send(endpoints::NICKNAME_MODERATE, &query, None).await?;
        Ok(parse_events(&response.text().await?)?)
    }

    /// Public profile details for several nicknames
    pub async fn fetch_nickname_info(&self, nicknames: &[&str]) -> Result<Vec<Value>, ChatError> {
        self.action(endpoints::NICKNAME_FETCH, nickname_form(nicknames))
            .await
    }

    pub async fn set_status(&self, status: Status) -> Result<Vec<Value>, ChatError> {
        let form = self.session_params(vec![("status", status.as_wire().to_string())]);
        self.action(endpoints::USER_STATUS_SET, form).await
    }

    /// Append the window id and CSRF token the chat expects
    fn session_params(&self, mut params: Params) -> Params {
        if let Some(window_id) = self.window_id {
            params.push(("wid", window_id.to_string()));
        }
        if let Some(csrf) = &self.csrf_token {
            params.push(("csrf", csrf.clone()));
        }
        params
    }

    /// POST a form and return whatever events the service answered with
    async fn action(&self, endpoint: Endpoint, form: Params) -> Result<Vec<Value>, ChatError> {
        let response = self.send(endpoint, &[], Some(&form)).await?;
        Ok(parse_action_events(&response.text().await?))
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
        form: Option<&[(&str, String)]>,
    ) -> Result<Response, ChatError> {
        let url = self.url_for(&endpoint);
        debug!("{:?} {}", endpoint.method, url);

        let mut request = self.client.request(endpoint.method.into(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response)
    }
}

/// Parse a response body into wire events
///
/// The service answers with either an array of events, a single event
/// object, or nothing.
pub fn parse_events(body: &str) -> Result<Vec<Value>, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(match serde_json::from_str(body)? {
        Value::Array(events) => events,
        Value::Null => Vec::new(),
        event => vec![event],
    })
}

/// Like [`parse_events`] for action endpoints, which may answer with plain
/// text on success
fn parse_action_events(body: &str) -> Vec<Value> {
    parse_events(body).unwrap_or_else(|e| {
        debug!("Action response is not JSON ({}), ignoring body", e);
        Vec::new()
    })
}

fn moderation_query(nickname: &str, room_id: Option<RoomId>) -> Params {
    let mut query = vec![("nick", nickname.to_string())];
    if let Some(room_id) = room_id {
        query.push(("roomId", room_id.to_string()));
    }
    query
}

/// One lowercased `nick` field per nickname
fn nickname_form(nicknames: &[&str]) -> Params {
    nicknames
        .iter()
        .map(|nickname| ("nick", nickname.to_lowercase()))
        .collect()
}

/// Value of one cookie in a `Cookie` header
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

fn join_ids(messages: &[MessageId]) -> String {
    messages
        .iter()
        .map(MessageId::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
