//! Retry policy the chat UI applies around a send.

use integration_tests::fixtures;
use integration_tests::setup::TestContext;
use lexchat_core::{Credentials, MessageDraft, Result};
use lexchat_workflow::SendOutcome;

async fn send_recovering(ctx: &TestContext, text: &str) -> Result<SendOutcome> {
    ctx.workflow
        .send_with_recovery(MessageDraft::text(text), ctx.backend.as_ref())
        .await
}

/// A failed follow-up is resent once as a new chat and counted once
#[tokio::test]
async fn test_failed_follow_up_retried_as_new_chat() {
    let ctx = TestContext::new();
    ctx.send_delivered(1).await;
    assert_eq!(ctx.workflow.current_chat().as_deref(), Some("chat-1"));

    ctx.backend.fail_next_sends(1);
    let outcome = send_recovering(&ctx, "follow-up").await.unwrap();

    let delivery = outcome.delivery().unwrap();
    assert!(delivery.new_chat);
    assert_eq!(ctx.backend.attempt_count(), 3);
    assert_eq!(ctx.message_count(), 2);

    let (request, _) = ctx.backend.last_request().unwrap();
    assert_eq!(request.chat_id, None);
    assert_eq!(request.message, "follow-up");
}

/// The new-chat retry happens once; a second failure is returned uncounted
#[tokio::test]
async fn test_new_chat_retry_only_once() {
    let ctx = TestContext::new();
    ctx.send_delivered(1).await;

    ctx.backend.fail_next_sends(2);
    let err = send_recovering(&ctx, "follow-up").await.unwrap_err();

    assert_eq!(err.error_code(), Some("SEND_001"));
    assert_eq!(ctx.backend.attempt_count(), 3);
    assert_eq!(ctx.message_count(), 1);
    assert_eq!(ctx.workflow.current_chat(), None);
}

/// Without a current chat there is nothing to fall back from
#[tokio::test]
async fn test_failed_first_message_not_retried() {
    let ctx = TestContext::new();
    ctx.backend.fail_next_sends(1);

    assert!(send_recovering(&ctx, "hello").await.is_err());

    assert_eq!(ctx.backend.attempt_count(), 1);
    assert_eq!(ctx.message_count(), 0);
}

/// A rejected access token is refreshed once and the message resent with it
#[tokio::test]
async fn test_rejected_token_refreshed_and_resent() {
    let ctx = TestContext::new();
    let credentials = ctx.login().await.unwrap();
    ctx.backend.reject_token(credentials.access_token);

    let outcome = send_recovering(&ctx, "after expiry").await.unwrap();

    assert!(outcome.delivery().is_some());
    assert_eq!(ctx.backend.attempt_count(), 2);
    let (_, auth) = ctx.backend.last_request().unwrap();
    assert_eq!(auth.access_token.as_deref(), Some("access-2"));
    assert_eq!(ctx.auth.token().as_deref(), Some("access-2"));
    assert_eq!(ctx.message_count(), 0);
}

/// A refresh that fails logs the user out instead of resending
#[tokio::test]
async fn test_failed_refresh_not_resent() {
    let ctx = TestContext::new();
    ctx.auth.set_credentials(Credentials {
        email: fixtures::EMAIL.into(),
        access_token: "stale".into(),
        refresh_token: Some("revoked".into()),
    });
    ctx.backend.reject_token("stale");

    assert!(send_recovering(&ctx, "after expiry").await.is_err());

    assert_eq!(ctx.backend.attempt_count(), 1);
    assert!(!ctx.auth.is_authenticated());
    assert_eq!(ctx.message_count(), 0);
}

/// The gate is not an error, so it never triggers a retry
#[tokio::test]
async fn test_limit_is_not_retried() {
    let ctx = TestContext::new();
    ctx.send_delivered(5).await;

    let outcome = send_recovering(&ctx, "sixth").await.unwrap();

    assert!(outcome.is_limit_reached());
    assert_eq!(ctx.backend.attempt_count(), 5);
    assert_eq!(ctx.limit_prompts(), 1);
}
