//! Wiring of store, tracker, auth session, backend, and workflow.

use anyhow::{Context, Result};
use lexchat_backend::HttpBackend;
use lexchat_core::{AnonymousTracker, Credentials, MessageDraft, SharedChat, SystemClock};
use lexchat_store::open_store;
use lexchat_workflow::{AuthSession, SendOutcome, SendWorkflow};
use std::future::Future;
use std::sync::Arc;

use crate::config::AppConfig;

pub struct App {
    pub config: AppConfig,
    pub backend: Arc<HttpBackend>,
    pub workflow: SendWorkflow,
}

impl App {
    pub fn build(config: AppConfig) -> Result<Self> {
        let store = open_store(&config.store);

        let tracker = AnonymousTracker::initialize(
            store.clone(),
            Arc::new(SystemClock),
            config.tracker.clone(),
        )
        .into_shared();

        let auth = Arc::new(AuthSession::hydrate(store));
        let backend =
            Arc::new(HttpBackend::new(&config.backend).context("Failed to create backend client")?);

        let workflow = SendWorkflow::new(tracker, backend.clone(), auth);
        let limit = config.tracker.message_limit;
        workflow.set_limit_callback(move || print_limit_prompt(limit));

        Ok(Self {
            config,
            backend,
            workflow,
        })
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        self.workflow.auth()
    }

    pub async fn send(&self, draft: MessageDraft) -> lexchat_core::Result<SendOutcome> {
        self.workflow
            .send_with_recovery(draft, self.backend.as_ref())
            .await
    }

    pub async fn continue_shared(
        &self,
        shared: &SharedChat,
        text: &str,
    ) -> lexchat_core::Result<SendOutcome> {
        self.workflow.continue_shared(shared, text).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials> {
        let credentials = self
            .auth()
            .login(self.backend.as_ref(), username, password)
            .await?;
        // Clear the anonymous counter now rather than on the next send
        self.workflow.sync_auth_events();
        Ok(credentials)
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<Credentials> {
        let credentials = self
            .auth()
            .register(self.backend.as_ref(), email, password)
            .await?;
        self.workflow.sync_auth_events();
        Ok(credentials)
    }

    /// Runs a call that needs an access token, refreshing once if the
    /// backend rejects the token.
    pub async fn authorized<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = lexchat_core::Result<T>>,
    {
        let token = self
            .auth()
            .token()
            .context("Not logged in, run `lexchat login` first")?;

        match call(token).await {
            Err(e) if e.is_token_rejected() => {
                let token = self.auth().refresh(self.backend.as_ref()).await?;
                Ok(call(token).await?)
            }
            other => Ok(other?),
        }
    }
}

fn print_limit_prompt(limit: u32) {
    println!();
    println!(
        "You have used all {} free messages. Log in (`lexchat login`) or create an account",
        limit
    );
    println!("(`lexchat register`) to keep chatting.");
}
