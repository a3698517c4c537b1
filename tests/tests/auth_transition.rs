//! Moving from anonymous to authenticated use and back.

use integration_tests::fixtures;
use integration_tests::setup::{TestContext, START_MILLIS};
use lexchat_core::storage::keys;
use lexchat_core::{KeyValueStore, MemoryStore, TrackerConfig};
use std::sync::Arc;

/// Logging in after hitting the limit clears the counter and unblocks sending
#[tokio::test]
async fn test_login_after_limit_unblocks() {
    let ctx = TestContext::new();
    ctx.send_delivered(5).await;
    assert!(ctx.send("blocked").await.unwrap().is_limit_reached());

    ctx.login().await.unwrap();
    let outcome = ctx.send("as a member").await.unwrap();

    assert!(outcome.delivery().is_some());
    assert_eq!(ctx.message_count(), 0);
    assert!(!ctx.is_limit_reached());

    let (_, auth) = ctx.backend.last_request().unwrap();
    assert_eq!(auth.access_token.as_deref(), Some("access-1"));
}

/// The session id survives login so the anonymous chat can be linked
#[tokio::test]
async fn test_session_id_kept_across_login() {
    let ctx = TestContext::new();
    let session_id = ctx.session_id();
    ctx.send_delivered(1).await;

    ctx.login().await.unwrap();
    ctx.send_delivered(1).await;

    let (_, auth) = ctx.backend.last_request().unwrap();
    assert_eq!(auth.session_id, session_id);
    assert!(auth.is_authenticated());
}

/// Authenticated messages never count against the anonymous limit
#[tokio::test]
async fn test_authenticated_sends_are_not_counted() {
    let ctx = TestContext::new();
    ctx.login().await.unwrap();

    ctx.send_delivered(8).await;

    assert_eq!(ctx.message_count(), 0);
    assert_eq!(ctx.limit_prompts(), 0);
}

/// The limit flag set while anonymous is consumed by the first
/// authenticated send
#[tokio::test]
async fn test_limit_transition_consumed_after_login() {
    let ctx = TestContext::new();
    ctx.send_delivered(5).await;
    assert!(ctx.workflow.tracker().lock().limit_transition_pending());

    ctx.login().await.unwrap();
    assert!(ctx.workflow.sync_auth_events());
    assert!(ctx.workflow.tracker().lock().limit_transition_pending());

    ctx.send_delivered(1).await;
    assert!(!ctx.workflow.tracker().lock().limit_transition_pending());
}

/// The reset happens once per login, not on every send
#[tokio::test]
async fn test_reset_applied_once_per_login() {
    let ctx = TestContext::new();
    ctx.login().await.unwrap();

    assert!(ctx.workflow.sync_auth_events());
    assert!(!ctx.workflow.sync_auth_events());
}

/// A token refresh is not a login
#[tokio::test]
async fn test_refresh_does_not_reset() {
    let ctx = TestContext::new();
    ctx.login().await.unwrap();
    ctx.workflow.sync_auth_events();

    ctx.auth.refresh(ctx.backend.as_ref()).await.unwrap();

    assert!(!ctx.workflow.sync_auth_events());
}

/// Logging out makes sends anonymous again, counted from zero
#[tokio::test]
async fn test_logout_returns_to_anonymous_counting() {
    let ctx = TestContext::new();
    ctx.send_delivered(4).await;
    ctx.login().await.unwrap();
    ctx.send_delivered(2).await;

    ctx.auth.clear();
    ctx.send_delivered(5).await;

    assert!(ctx.is_limit_reached());
    assert!(ctx.send("sixth").await.unwrap().is_limit_reached());
    let (_, auth) = ctx.backend.last_request().unwrap();
    assert!(!auth.is_authenticated());
}

/// A failed login changes nothing
#[tokio::test]
async fn test_failed_login_keeps_limit() {
    let ctx = TestContext::new();
    ctx.send_delivered(5).await;

    let err = ctx
        .auth
        .login(ctx.backend.as_ref(), fixtures::EMAIL, "wrong")
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), Some("AUTH_002"));
    assert!(ctx.send("still blocked").await.unwrap().is_limit_reached());
}

/// Credentials restored from storage bypass the gate without resetting it
#[tokio::test]
async fn test_hydrated_session_bypasses_gate() {
    let last_message = START_MILLIS.to_string();
    let store = Arc::new(MemoryStore::with_entries([
        (keys::SESSION_ID, "anon-42"),
        (keys::MESSAGE_COUNT, "5"),
        (keys::LAST_MESSAGE_TIME, last_message.as_str()),
        (keys::USER, fixtures::EMAIL),
        (keys::TOKEN, "stored-token"),
        (keys::REFRESH_TOKEN, "refresh-9"),
    ]));
    let ctx = TestContext::with_store(store, TrackerConfig::default());

    let outcome = ctx.send("still logged in").await.unwrap();

    assert!(outcome.delivery().is_some());
    assert_eq!(ctx.message_count(), 5);
    let (_, auth) = ctx.backend.last_request().unwrap();
    assert_eq!(auth.session_id, "anon-42");
    assert_eq!(auth.access_token.as_deref(), Some("stored-token"));
}

/// A rejected refresh logs the user out and anonymous limits apply again
#[tokio::test]
async fn test_failed_refresh_logs_out() {
    let ctx = TestContext::new();
    ctx.login().await.unwrap();

    ctx.backend.set_should_fail(true);
    let err = ctx.auth.refresh(ctx.backend.as_ref()).await.unwrap_err();
    ctx.backend.set_should_fail(false);

    assert_eq!(err.error_code(), Some("AUTH_004"));
    assert!(!ctx.auth.is_authenticated());
    assert_eq!(ctx.store.get(keys::TOKEN).unwrap(), None);

    ctx.send_delivered(1).await;
    assert_eq!(ctx.message_count(), 1);
}
