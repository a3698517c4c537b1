//! Common test setup functions.

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lexchat_backend::{BackendConfig, HttpBackend};
use lexchat_core::{
    AnonymousTracker, Credentials, ManualClock, MemoryStore, MessageDraft, Result, Role,
    SharedStore, TrackerConfig,
};
use lexchat_workflow::{AuthSession, SendOutcome, SendWorkflow};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::fixtures;
use crate::mocks::MockBackend;

/// Fixed start time so window arithmetic is reproducible.
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Workflow wired to a mock backend, an in-memory store, and a manual clock.
///
/// Runs the same tracker, auth session, and workflow code as the CLI; only
/// the network and the wall clock are replaced.
pub struct TestContext {
    pub store: SharedStore,
    pub clock: Arc<ManualClock>,
    pub backend: Arc<MockBackend>,
    pub auth: Arc<AuthSession>,
    pub workflow: SendWorkflow,
    limit_prompts: Arc<AtomicUsize>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_store(store: SharedStore, config: TrackerConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let tracker =
            AnonymousTracker::initialize(store.clone(), clock.clone(), config).into_shared();
        let backend = Arc::new(MockBackend::new());
        let auth = Arc::new(AuthSession::hydrate(store.clone()));
        let workflow = SendWorkflow::new(tracker, backend.clone(), auth.clone());

        let limit_prompts = Arc::new(AtomicUsize::new(0));
        let prompts = limit_prompts.clone();
        workflow.set_limit_callback(move || {
            prompts.fetch_add(1, Ordering::SeqCst);
        });

        Self {
            store,
            clock,
            backend,
            auth,
            workflow,
            limit_prompts,
        }
    }

    pub async fn send(&self, text: &str) -> Result<SendOutcome> {
        self.workflow.send(MessageDraft::text(text)).await
    }

    /// Sends `n` messages, asserting each is delivered.
    pub async fn send_delivered(&self, n: usize) {
        for i in 0..n {
            let outcome = self
                .send(&format!("question {}", i + 1))
                .await
                .expect("send failed");
            assert!(
                outcome.delivery().is_some(),
                "message {} was not delivered",
                i + 1
            );
        }
    }

    pub fn message_count(&self) -> u32 {
        self.workflow.tracker().lock().message_count()
    }

    pub fn is_limit_reached(&self) -> bool {
        self.workflow.tracker().lock().is_limit_reached()
    }

    pub fn session_id(&self) -> String {
        self.workflow.tracker().lock().session_id().to_string()
    }

    /// How often the limit callback has fired.
    pub fn limit_prompts(&self) -> usize {
        self.limit_prompts.load(Ordering::SeqCst)
    }

    pub fn advance_hours(&self, n: i64) {
        self.clock.advance(fixtures::hours(n));
    }

    pub async fn login(&self) -> Result<Credentials> {
        self.auth
            .login(self.backend.as_ref(), fixtures::EMAIL, fixtures::PASSWORD)
            .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A request as the fake server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub session_id: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
pub struct FakeState {
    requests: Mutex<Vec<RecordedRequest>>,
    history_hits: AtomicUsize,
    limit_reached: AtomicBool,
}

impl FakeState {
    fn record(&self, path: &str, headers: &HeaderMap, body: Value) {
        self.requests.lock().push(RecordedRequest {
            path: path.to_string(),
            session_id: header(headers, "x-anonymous-session-id"),
            authorization: header(headers, "authorization"),
            body,
        });
    }
}

/// Local axum server speaking the backend's HTTP contract.
///
/// Accepts password `fixtures::PASSWORD`, refresh token `refresh-good`, and
/// rejects the access token `expired`. History for chat id `missing` is a 404.
pub struct FakeServer {
    pub base_url: String,
    pub state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let router = Router::new()
            .route("/api/v1/chatbot/chat", post(chat))
            .route("/api/v1/chat/chats", get(list_chats))
            .route("/api/v1/chat/chats/:id/messages", get(history))
            .route("/api/v1/chat/shared/:id", get(shared))
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/register", post(register))
            .route("/api/v1/auth/refresh", post(refresh))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("No local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn backend(&self) -> HttpBackend {
        HttpBackend::new(&BackendConfig::new(&self.base_url)).expect("Failed to create client")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("No request recorded")
    }

    pub fn history_hits(&self) -> usize {
        self.state.history_hits.load(Ordering::SeqCst)
    }

    pub fn set_limit_reached(&self, reached: bool) {
        self.state.limit_reached.store(reached, Ordering::SeqCst);
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn detail(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn token_rejected(headers: &HeaderMap) -> bool {
    header(headers, "authorization").as_deref() == Some("Bearer expired")
}

async fn chat(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/api/v1/chatbot/chat", &headers, body.clone());

    if token_rejected(&headers) {
        return detail(StatusCode::UNAUTHORIZED, "Token expired");
    }

    let chat_id = body
        .get("chat_id")
        .and_then(Value::as_str)
        .unwrap_or("chat-new")
        .to_string();
    let message = body.get("message").and_then(Value::as_str).unwrap_or("");

    Json(json!({
        "chat_id": chat_id,
        "answer": format!("Answer to: {}", message),
        "sources": [{ "url": "https://law.example.com/statute" }],
        "limit_reached": state.limit_reached.load(Ordering::SeqCst),
    }))
    .into_response()
}

async fn list_chats(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.record("/api/v1/chat/chats", &headers, Value::Null);

    if token_rejected(&headers) || header(&headers, "authorization").is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }

    Json(json!([{
        "id": "chat-1",
        "title": "Deposit dispute",
        "created_at": "2026-01-01T10:00:00Z",
        "updated_at": "2026-01-02T10:00:00Z",
    }]))
    .into_response()
}

async fn history(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.history_hits.fetch_add(1, Ordering::SeqCst);

    if token_rejected(&headers) {
        return detail(StatusCode::UNAUTHORIZED, "Token expired");
    }
    if id == "missing" {
        return detail(StatusCode::NOT_FOUND, "Chat not found");
    }

    Json(vec![
        fixtures::chat_message(&id, Role::Human, "Is a verbal lease binding?"),
        fixtures::chat_message(&id, Role::Assistant, "Usually, for short terms."),
    ])
    .into_response()
}

async fn shared(Path(id): Path<String>) -> Response {
    Json(fixtures::shared_chat(&id)).into_response()
}

async fn login(State(state): State<Arc<FakeState>>, mut form: Multipart) -> Response {
    let mut username = None;
    let mut password = None;

    while let Ok(Some(field)) = form.next_field().await {
        let name = field.name().map(str::to_string);
        let value = field.text().await.unwrap_or_default();
        match name.as_deref() {
            Some("username") => username = Some(value),
            Some("password") => password = Some(value),
            _ => {}
        }
    }

    state.record(
        "/api/v1/auth/login",
        &HeaderMap::new(),
        json!({ "username": username }),
    );

    if password.as_deref() != Some(fixtures::PASSWORD) {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password");
    }

    Json(json!({
        "access_token": "access-login",
        "refresh_token": "refresh-good",
        "token_type": "bearer",
    }))
    .into_response()
}

async fn register(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.record("/api/v1/auth/register", &HeaderMap::new(), body);
    Json(json!({ "access_token": "access-register", "token_type": "bearer" })).into_response()
}

async fn refresh(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.record("/api/v1/auth/refresh", &HeaderMap::new(), body.clone());

    if body.get("refresh_token").and_then(Value::as_str) != Some("refresh-good") {
        return detail(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }
    Json(json!({ "access_token": "access-refreshed", "token_type": "bearer" })).into_response()
}
