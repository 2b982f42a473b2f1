//! Client configuration
//!
//! Where to connect and how long a long-poll bind may block.

use std::time::Duration;

use crate::error::ChatError;

/// Domain hosting chats that have no custom host
pub const CHATOVOD_DOMAIN: &str = "chatovod.com";

/// Deadline for one long-poll bind request
pub const DEFAULT_BIND_TIMEOUT: Duration = Duration::from_secs(80);

/// Number of history messages requested when entering the chat
pub const DEFAULT_MESSAGE_LIMIT: u32 = 80;

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("chatovod-rs/", env!("CARGO_PKG_VERSION"));

/// Connection settings for one chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Chat host, e.g. `mychat.chatovod.com`
    pub host: String,
    /// Use https (the session cookie name depends on it)
    pub secure: bool,
    pub user_agent: String,
    pub bind_timeout: Duration,
    pub message_limit: u32,
}

impl ClientConfig {
    /// Configuration for `<name>.chatovod.com`
    pub fn for_chat(name: &str) -> Self {
        Self::custom_host(format!("{}.{}", name, CHATOVOD_DOMAIN))
    }

    /// Configuration for a chat on its own domain
    pub fn custom_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            secure: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bind_timeout: DEFAULT_BIND_TIMEOUT,
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_bind_timeout(mut self, bind_timeout: Duration) -> Self {
        self.bind_timeout = bind_timeout;
        self
    }

    pub fn with_message_limit(mut self, message_limit: u32) -> Self {
        self.message_limit = message_limit;
        self
    }

    /// Base URL of the chat, without trailing slash
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}",
            if self.secure { "https" } else { "http" },
            self.host
        )
    }

    /// Read the configuration from `CHATOVOD_*` environment variables
    ///
    /// Returns `Ok(None)` when neither `CHATOVOD_HOST` nor `CHATOVOD_CHAT`
    /// is set.
    pub fn from_env() -> Result<Option<Self>, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match (lookup("CHATOVOD_HOST"), lookup("CHATOVOD_CHAT")) {
            (Some(host), _) => Self::custom_host(host),
            (None, Some(chat)) => Self::for_chat(&chat),
            (None, None) => return Ok(None),
        };

        if let Some(insecure) = lookup("CHATOVOD_INSECURE") {
            config.secure = !matches!(insecure.as_str(), "1" | "true" | "yes");
        }
        if let Some(secs) = lookup("CHATOVOD_BIND_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                ChatError::Config(format!("invalid CHATOVOD_BIND_TIMEOUT_SECS: {}", secs))
            })?;
            config.bind_timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = lookup("CHATOVOD_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_for_chat() {
        let config = ClientConfig::for_chat("mychat");
        assert_eq!(config.host, "mychat.chatovod.com");
        assert_eq!(config.base_url(), "https://mychat.chatovod.com");
        assert_eq!(config.bind_timeout, DEFAULT_BIND_TIMEOUT);
    }

    #[test]
    fn test_insecure_custom_host() {
        let config = ClientConfig::custom_host("chat.example.org").with_secure(false);
        assert_eq!(config.base_url(), "http://chat.example.org");
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("CHATOVOD_CHAT", "lobby"),
            ("CHATOVOD_INSECURE", "1"),
            ("CHATOVOD_BIND_TIMEOUT_SECS", "30"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(config.host, "lobby.chatovod.com");
        assert!(!config.secure);
        assert_eq!(config.bind_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_host_wins() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("CHATOVOD_CHAT", "lobby"),
            ("CHATOVOD_HOST", "chat.example.org"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.host, "chat.example.org");
    }

    #[test]
    fn test_from_lookup_unset() {
        assert!(ClientConfig::from_lookup(lookup(&[])).unwrap().is_none());
    }

    #[test]
    fn test_from_lookup_invalid_timeout() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("CHATOVOD_CHAT", "lobby"),
            ("CHATOVOD_BIND_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }
}
