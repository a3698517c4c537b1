//! Authentication session.
//!
//! Holds the current credentials, persists them through the storage port,
//! and announces login transitions on a broadcast channel. The send
//! workflow subscribes so it can clear the anonymous counter after login.

use lexchat_backend::AuthBackend;
use lexchat_core::storage::keys;
use lexchat_core::{
    AuthErrorCode, Credentials, Error, LoginRequest, RegisterRequest, Result, SharedStore,
    StoreOp,
};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Broadcast buffer; subscribers drain it on every send.
const EVENT_CAPACITY: usize = 16;

/// Credential lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Credentials appeared where there were none.
    LoggedIn { email: String },
    /// Token replaced while already logged in.
    TokenRefreshed,
    LoggedOut,
}

pub struct AuthSession {
    store: SharedStore,
    credentials: RwLock<Option<Credentials>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthSession {
    /// Creates a logged-out session.
    pub fn new(store: SharedStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            credentials: RwLock::new(None),
            events,
        }
    }

    /// Restores credentials persisted by an earlier run. Restoring does not
    /// emit `LoggedIn`; the anonymous counter was reset when that login
    /// happened.
    pub fn hydrate(store: SharedStore) -> Self {
        let session = Self::new(store);

        match session.load() {
            Ok(Some(credentials)) => {
                debug!(email = %credentials.email, "Restored credentials");
                *session.credentials.write() = Some(credentials);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read stored credentials"),
        }

        session
    }

    fn load(&self) -> Result<Option<Credentials>> {
        let email = self.store.get(keys::USER)?;
        let token = self.store.get(keys::TOKEN)?.filter(|t| !t.is_empty());
        let refresh_token = self
            .store
            .get(keys::REFRESH_TOKEN)?
            .filter(|t| !t.is_empty());

        Ok(match (email, token) {
            (Some(email), Some(access_token)) => Some(Credentials {
                email,
                access_token,
                refresh_token,
            }),
            _ => None,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.credentials
            .read()
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.read().is_some()
    }

    /// Stores new credentials. Emits `LoggedIn` on a transition from
    /// logged-out, `TokenRefreshed` otherwise.
    pub fn set_credentials(&self, credentials: Credentials) {
        let mut ops = vec![
            StoreOp::set(keys::USER, credentials.email.clone()),
            StoreOp::set(keys::TOKEN, credentials.access_token.clone()),
        ];
        ops.push(match &credentials.refresh_token {
            Some(refresh) => StoreOp::set(keys::REFRESH_TOKEN, refresh.clone()),
            None => StoreOp::remove(keys::REFRESH_TOKEN),
        });
        if let Err(e) = self.store.apply(ops) {
            warn!(error = %e, "Failed to persist credentials, keeping them in memory");
        }

        let email = credentials.email.clone();
        let was_logged_in = self.credentials.write().replace(credentials).is_some();

        let event = if was_logged_in {
            AuthEvent::TokenRefreshed
        } else {
            info!(email = %email, "Logged in");
            AuthEvent::LoggedIn { email }
        };
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Drops credentials from memory and storage.
    pub fn clear(&self) {
        if let Err(e) = self.store.apply(vec![
            StoreOp::remove(keys::USER),
            StoreOp::remove(keys::TOKEN),
            StoreOp::remove(keys::REFRESH_TOKEN),
        ]) {
            warn!(error = %e, "Failed to remove stored credentials");
        }

        if self.credentials.write().take().is_some() {
            info!("Logged out");
            let _ = self.events.send(AuthEvent::LoggedOut);
        }
    }

    /// Logs in with username and password.
    pub async fn login(
        &self,
        backend: &dyn AuthBackend,
        username: &str,
        password: &str,
    ) -> Result<Credentials> {
        let request = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let tokens = backend.login(&request).await?;

        let credentials = Credentials::from_tokens(request.username, tokens);
        self.set_credentials(credentials.clone());
        Ok(credentials)
    }

    /// Registers a new account and logs in with the issued tokens.
    pub async fn register(
        &self,
        backend: &dyn AuthBackend,
        email: &str,
        password: &str,
    ) -> Result<Credentials> {
        let request = RegisterRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let tokens = backend.register(&request).await?;

        let credentials = Credentials::from_tokens(request.email, tokens);
        self.set_credentials(credentials.clone());
        Ok(credentials)
    }

    /// Exchanges the refresh token for a new access token. Credentials are
    /// cleared if the exchange fails.
    pub async fn refresh(&self, backend: &dyn AuthBackend) -> Result<String> {
        let current = self
            .credentials()
            .ok_or_else(|| Error::auth(AuthErrorCode::NotAuthenticated, "Not logged in"))?;

        let refresh_token = match current.refresh_token.as_deref() {
            Some(token) => token.to_string(),
            None => {
                self.clear();
                return Err(Error::auth(
                    AuthErrorCode::RefreshFailed,
                    "No refresh token stored, log in again",
                ));
            }
        };

        match backend.refresh(&refresh_token).await {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                let refreshed = Credentials {
                    email: current.email,
                    access_token: tokens.access_token,
                    // Keep the old refresh token if the backend did not rotate it
                    refresh_token: tokens.refresh_token.or(Some(refresh_token)),
                };
                self.set_credentials(refreshed);
                Ok(access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing credentials");
                self.clear();
                Err(e)
            }
        }
    }
}
