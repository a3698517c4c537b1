//! HTTP client for the chatbot backend.

use async_trait::async_trait;
use lexchat_core::limits::{HISTORY_CACHE_MAX_CAPACITY, HISTORY_CACHE_TTL_SECS};
use lexchat_core::{
    validate_input, AuthErrorCode, ChatMessage, ChatReply, ChatRequest, ChatSummary, Error,
    LoginRequest, RefreshRequest, RegisterRequest, RequestAuth, Result, SharedChat, TokenPair,
    ANONYMOUS_SESSION_HEADER,
};
use moka::future::Cache;
use reqwest::multipart::Form;
use std::time::Duration;
use telemetry::health;
use tracing::{debug, warn};
use url::Url;

use crate::backend::{AuthBackend, ChatBackend};
use crate::config::BackendConfig;
use crate::response::{decode, transport_error};

const CHAT_PATH: &[&str] = &["api", "v1", "chatbot", "chat"];
const CHATS_PATH: &[&str] = &["api", "v1", "chat", "chats"];
const SHARED_PATH: &[&str] = &["api", "v1", "chat", "shared"];
const LOGIN_PATH: &[&str] = &["api", "v1", "auth", "login"];
const REGISTER_PATH: &[&str] = &["api", "v1", "auth", "register"];
const REFRESH_PATH: &[&str] = &["api", "v1", "auth", "refresh"];

/// Backend client.
///
/// Chat history and shared chats are cached briefly; sending into a chat
/// invalidates its cached history.
#[derive(Clone)]
pub struct HttpBackend {
    /// Base URL, always ending in '/'
    base_url: Url,
    http_client: reqwest::Client,
    /// Chat id -> messages
    history_cache: Cache<String, Vec<ChatMessage>>,
    /// Shared chat id -> chat
    shared_cache: Cache<String, SharedChat>,
}

impl HttpBackend {
    /// Creates a new backend client.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = config.parsed_base_url()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        let ttl = Duration::from_secs(HISTORY_CACHE_TTL_SECS);

        Ok(Self {
            base_url,
            http_client,
            history_cache: Cache::builder()
                .max_capacity(HISTORY_CACHE_MAX_CAPACITY)
                .time_to_live(ttl)
                .build(),
            shared_cache: Cache::builder()
                .max_capacity(HISTORY_CACHE_MAX_CAPACITY)
                .time_to_live(ttl)
                .build(),
        })
    }

    /// Builds an endpoint URL under the base path. Segments are percent-encoded.
    fn endpoint(&self, path: &[&str], extra: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("Backend URL cannot be a base"))?
            .pop_if_empty()
            .extend(path)
            .extend(extra);
        Ok(url)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        match request.send().await {
            Ok(response) => {
                health().backend.set_healthy();
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "Backend request failed");
                health().backend.set_unhealthy(e.to_string());
                Err(transport_error(e))
            }
        }
    }

    /// Lists the user's chats.
    pub async fn list_chats(&self, token: &str) -> Result<Vec<ChatSummary>> {
        let url = self.endpoint(CHATS_PATH, &[])?;
        let response = self
            .execute(self.http_client.get(url).bearer_auth(token))
            .await?;
        decode(response).await
    }

    /// Fetches a chat's messages, served from cache when fresh.
    pub async fn chat_history(&self, token: &str, chat_id: &str) -> Result<Vec<ChatMessage>> {
        if let Some(cached) = self.history_cache.get(chat_id).await {
            debug!(chat_id, "History cache hit");
            return Ok(cached);
        }

        let url = self.endpoint(CHATS_PATH, &[chat_id, "messages"])?;
        let response = self
            .execute(self.http_client.get(url).bearer_auth(token))
            .await?;
        let messages: Vec<ChatMessage> = decode(response).await?;

        self.history_cache
            .insert(chat_id.to_string(), messages.clone())
            .await;
        Ok(messages)
    }

    /// Fetches a chat published through a share link. No credentials needed.
    pub async fn shared_chat(&self, chat_id: &str) -> Result<SharedChat> {
        if let Some(cached) = self.shared_cache.get(chat_id).await {
            debug!(chat_id, "Shared chat cache hit");
            return Ok(cached);
        }

        let url = self.endpoint(SHARED_PATH, &[chat_id])?;
        let response = self.execute(self.http_client.get(url)).await?;
        let chat: SharedChat = decode(response).await?;

        self.shared_cache
            .insert(chat_id.to_string(), chat.clone())
            .await;
        Ok(chat)
    }

    /// Drops cached history for a chat.
    pub async fn invalidate_history(&self, chat_id: &str) {
        self.history_cache.invalidate(chat_id).await;
    }

    /// Checks whether the backend answers at all.
    pub async fn check_reachable(&self) -> bool {
        self.execute(self.http_client.get(self.base_url.clone()))
            .await
            .is_ok()
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, request: &ChatRequest, auth: &RequestAuth) -> Result<ChatReply> {
        validate_input(request)?;

        let url = self.endpoint(CHAT_PATH, &[])?;
        let mut builder = self
            .http_client
            .post(url)
            .header(ANONYMOUS_SESSION_HEADER, &auth.session_id)
            .json(request);

        if let Some(token) = &auth.access_token {
            builder = builder.bearer_auth(token);
        }

        debug!(
            chat_id = request.chat_id.as_deref().unwrap_or("new"),
            authenticated = auth.is_authenticated(),
            "Sending chat message"
        );

        let response = self.execute(builder).await?;
        let reply: ChatReply = decode(response).await?;

        if let Some(chat_id) = &request.chat_id {
            self.invalidate_history(chat_id).await;
        }
        self.invalidate_history(&reply.chat_id).await;

        Ok(reply)
    }
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> Result<TokenPair> {
        validate_input(request)?;

        let url = self.endpoint(LOGIN_PATH, &[])?;
        let form = Form::new()
            .text("username", request.username.clone())
            .text("password", request.password.clone());

        let response = self
            .execute(self.http_client.post(url).multipart(form))
            .await?;

        decode(response).await.map_err(|e| match e {
            Error::Auth { message, .. } => Error::auth(AuthErrorCode::InvalidCredentials, message),
            other => other,
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<TokenPair> {
        validate_input(request)?;

        let url = self.endpoint(REGISTER_PATH, &[])?;
        let response = self
            .execute(self.http_client.post(url).json(request))
            .await?;
        decode(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let url = self.endpoint(REFRESH_PATH, &[])?;
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };

        let response = self
            .execute(self.http_client.post(url).json(&body))
            .await?;

        decode(response).await.map_err(|e| {
            Error::auth(AuthErrorCode::RefreshFailed, format!("Token refresh failed: {}", e))
        })
    }
}
