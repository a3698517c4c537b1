//! Backend collaborator traits.

use async_trait::async_trait;
use lexchat_core::{
    ChatReply, ChatRequest, LoginRequest, RegisterRequest, RequestAuth, Result, TokenPair,
};

/// Sends chat messages.
///
/// Implemented by `HttpBackend` and by test doubles, so the workflow can be
/// exercised without a network.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one message and returns the generated reply.
    async fn send_message(&self, request: &ChatRequest, auth: &RequestAuth) -> Result<ChatReply>;
}

/// Issues and refreshes tokens.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<TokenPair>;

    async fn register(&self, request: &RegisterRequest) -> Result<TokenPair>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
}
