//! Send-message workflow.
//!
//! Anonymous sends are gated on the tracker: the window reset is applied
//! first, a user at the limit is refused without contacting the backend,
//! and the counter moves only after the backend has answered. Authenticated
//! sends bypass the gate entirely.

use lexchat_backend::{AuthBackend, ChatBackend};
use lexchat_core::{
    ChatReply, ChatRequest, Error, MessageDraft, RequestAuth, Result, SharedChat, SharedTracker,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::auth::{AuthEvent, AuthSession};

/// Invoked when an anonymous user is refused. Typically prompts for login.
pub type LimitCallback = Arc<dyn Fn() + Send + Sync>;

/// Result of a send attempt that did not fail.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Delivered(Delivery),
    /// Refused locally, or the backend reported the limit.
    LimitReached,
}

impl SendOutcome {
    pub fn is_limit_reached(&self) -> bool {
        matches!(self, SendOutcome::LimitReached)
    }

    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            SendOutcome::Delivered(delivery) => Some(delivery),
            SendOutcome::LimitReached => None,
        }
    }
}

/// A reply and where it landed.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub reply: ChatReply,
    /// Chat the reply belongs to; now the current chat.
    pub chat_id: String,
    /// The message started a new chat.
    pub new_chat: bool,
    /// The backend moved the conversation to a different chat id.
    pub chat_transferred: bool,
}

pub struct SendWorkflow {
    tracker: SharedTracker,
    backend: Arc<dyn ChatBackend>,
    auth: Arc<AuthSession>,
    auth_events: Mutex<broadcast::Receiver<AuthEvent>>,
    on_limit: Mutex<Option<LimitCallback>>,
    current_chat: Mutex<Option<String>>,
}

impl SendWorkflow {
    pub fn new(
        tracker: SharedTracker,
        backend: Arc<dyn ChatBackend>,
        auth: Arc<AuthSession>,
    ) -> Self {
        let auth_events = Mutex::new(auth.subscribe());
        Self {
            tracker,
            backend,
            auth,
            auth_events,
            on_limit: Mutex::new(None),
            current_chat: Mutex::new(None),
        }
    }

    pub fn set_limit_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.on_limit.lock() = Some(Arc::new(callback));
    }

    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    pub fn current_chat(&self) -> Option<String> {
        self.current_chat.lock().clone()
    }

    /// Next send starts a new chat.
    pub fn new_chat(&self) {
        *self.current_chat.lock() = None;
    }

    pub fn select_chat(&self, chat_id: impl Into<String>) {
        *self.current_chat.lock() = Some(chat_id.into());
    }

    /// Applies pending login events to the tracker. Returns whether the
    /// anonymous counter was reset.
    pub fn sync_auth_events(&self) -> bool {
        let mut receiver = self.auth_events.lock();
        let mut logged_in = false;

        loop {
            match receiver.try_recv() {
                Ok(AuthEvent::LoggedIn { email }) => {
                    debug!(email = %email, "Observed login");
                    logged_in = true;
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed auth events");
                    logged_in |= self.auth.is_authenticated();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if logged_in {
            self.tracker.lock().reset_after_authentication();
            metrics().auth_resets.inc();
        }
        logged_in
    }

    /// Sends a message into the current chat.
    ///
    /// Validation and storage problems never count against the limit, and
    /// a failed backend call leaves the counter untouched.
    pub async fn send(&self, draft: MessageDraft) -> Result<SendOutcome> {
        draft.validate()?;
        self.sync_auth_events();

        let chat_id = self.current_chat();
        match self.auth.token() {
            Some(token) => self.send_authenticated(&draft, chat_id, token).await,
            None => self.send_anonymous(&draft, chat_id).await,
        }
    }

    /// Sends with the recovery the chat UI applies on top of [`send`]: a
    /// rejected access token is refreshed once and the message resent, and a
    /// failed send into an existing chat is retried once as a new chat.
    ///
    /// Each recovery runs at most once per call, and the anonymous counter
    /// moves only for the attempt that succeeds.
    ///
    /// [`send`]: SendWorkflow::send
    pub async fn send_with_recovery(
        &self,
        draft: MessageDraft,
        auth_backend: &dyn AuthBackend,
    ) -> Result<SendOutcome> {
        match self.send(draft.clone()).await {
            Err(e) if e.is_token_rejected() => {
                info!("Access token rejected, refreshing");
                self.auth.refresh(auth_backend).await?;
                self.send(draft).await
            }
            Err(e @ Error::Send { .. }) if self.current_chat().is_some() => {
                warn!(error = %e, "Send into current chat failed, retrying as a new chat");
                self.new_chat();
                self.send(draft).await
            }
            other => other,
        }
    }

    /// Continues a shared conversation in a new chat of its own.
    pub async fn continue_shared(&self, shared: &SharedChat, text: &str) -> Result<SendOutcome> {
        self.new_chat();
        let draft = MessageDraft::text(text).with_previous_messages(shared.prior_messages());
        self.send(draft).await
    }

    async fn send_anonymous(
        &self,
        draft: &MessageDraft,
        chat_id: Option<String>,
    ) -> Result<SendOutcome> {
        let (blocked, session_id) = {
            let mut tracker = self.tracker.lock();
            tracker.refresh_from_store();
            if tracker.check_and_apply_time_reset() {
                metrics().window_resets.inc();
            }
            (tracker.is_limit_reached(), tracker.session_id().to_string())
        };

        if blocked {
            info!(session_id = %session_id, "Anonymous limit reached, message not sent");
            metrics().messages_blocked.inc();
            self.notify_limit();
            return Ok(SendOutcome::LimitReached);
        }

        let request = draft.to_request(chat_id.clone());
        let reply = self
            .dispatch(&request, &RequestAuth::anonymous(session_id.clone()))
            .await?;

        // A login that landed while the request was in flight has already
        // cleared the counter; the account must not start at one.
        let logged_in = self.sync_auth_events() || self.auth.is_authenticated();
        if logged_in {
            info!(session_id = %session_id, "Logged in during send, message not counted");
        } else {
            self.tracker.lock().increment();
            metrics().anonymous_messages_sent.inc();
        }

        if reply.limit_reached {
            warn!("Backend reported anonymous limit reached");
            metrics().server_limit_signals.inc();
            if !logged_in {
                self.notify_limit();
            }
            return Ok(SendOutcome::LimitReached);
        }

        Ok(SendOutcome::Delivered(self.adopt_reply(chat_id, reply)))
    }

    async fn send_authenticated(
        &self,
        draft: &MessageDraft,
        chat_id: Option<String>,
        token: String,
    ) -> Result<SendOutcome> {
        let session_id = {
            let mut tracker = self.tracker.lock();
            if tracker.take_limit_transition() {
                info!(
                    session_id = %tracker.session_id(),
                    "First authenticated message after anonymous limit"
                );
            }
            tracker.session_id().to_string()
        };

        let request = draft.to_request(chat_id.clone());
        let reply = self
            .dispatch(&request, &RequestAuth::authenticated(session_id, token))
            .await?;

        if reply.limit_reached {
            warn!("Backend reported a limit for an authenticated user");
            metrics().server_limit_signals.inc();
            return Ok(SendOutcome::LimitReached);
        }

        Ok(SendOutcome::Delivered(self.adopt_reply(chat_id, reply)))
    }

    async fn dispatch(
        &self,
        request: &ChatRequest,
        auth: &RequestAuth,
    ) -> Result<ChatReply> {
        let start = Instant::now();

        match self.backend.send_message(request, auth).await {
            Ok(reply) => {
                metrics().send_latency.record(start.elapsed());
                metrics().messages_sent.inc();
                Ok(reply)
            }
            Err(e) => {
                warn!(error = %e, "Failed to send message");
                metrics().send_failures.inc();
                Err(e)
            }
        }
    }

    fn adopt_reply(&self, sent_to: Option<String>, reply: ChatReply) -> Delivery {
        let chat_transferred = matches!(&sent_to, Some(id) if *id != reply.chat_id);
        if chat_transferred {
            info!(
                from = sent_to.as_deref().unwrap_or_default(),
                to = %reply.chat_id,
                "Chat transferred to a new id"
            );
        }

        *self.current_chat.lock() = Some(reply.chat_id.clone());

        Delivery {
            chat_id: reply.chat_id.clone(),
            new_chat: sent_to.is_none(),
            chat_transferred,
            reply,
        }
    }

    fn notify_limit(&self) {
        let callback = self.on_limit.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}
