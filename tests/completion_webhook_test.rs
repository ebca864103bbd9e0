//! Completion webhook delivery.
//!
//! Webhooks are fire-and-forget: one POST when the operation stops
//! stepping, the summary merged over the caller's base body, and a failed
//! delivery never disturbs the step outcome.

mod common;

use serde_json::json;

use agentrun_core::models::OperationStatus;
use agentrun_core::RuntimeError;

use common::harness::TestHarness;
use common::mock_executor::ScriptedStep;
use common::webhook_sink::WebhookSink;

/// The summary lands merged over the configured base body.
#[tokio::test]
async fn completion_posts_summary_merged_over_base_body() {
    let mut sink = WebhookSink::start().await;
    let harness = TestHarness::new();
    let operation = harness
        .seed_with_webhook(sink.url(), Some(json!({"source": "agentrun-tests"})))
        .await;
    harness.executor.script(ScriptedStep::done());

    let result = harness.run_step(operation.operation_id, 0).await.unwrap();
    assert!(result.success);

    let body = sink.next_delivery().await;
    assert_eq!(body["source"], json!("agentrun-tests"));
    assert_eq!(body["reason"], json!("done"));
    assert_eq!(body["status"], json!("done"));
    assert_eq!(body["steps"], json!(1));
    assert_eq!(
        body["operation_id"],
        json!(operation.operation_id.to_string())
    );
    assert!(body.get("error_message").is_none());
}

/// Without a base body the summary posts on its own.
#[tokio::test]
async fn completion_posts_bare_summary_without_base_body() {
    let mut sink = WebhookSink::start().await;
    let harness = TestHarness::new();
    let operation = harness.seed_with_webhook(sink.url(), None).await;
    harness.executor.script(ScriptedStep::done());

    harness.run_step(operation.operation_id, 0).await.unwrap();

    let body = sink.next_delivery().await;
    assert_eq!(body["reason"], json!("done"));
    assert!(body.get("source").is_none());
}

/// A step that ends continuable but proposes no follow-up context stops
/// the loop: nothing lands on the queue and the webhook reports `done`
/// with the status the step left behind.
#[tokio::test]
async fn running_status_without_next_context_completes_as_done() {
    let mut sink = WebhookSink::start().await;
    let harness = TestHarness::new();
    let operation = harness.seed_with_webhook(sink.url(), None).await;
    harness
        .executor
        .script(ScriptedStep::Finish(OperationStatus::Running));

    let result = harness.run_step(operation.operation_id, 0).await.unwrap();
    assert!(result.success);
    assert!(!result.next_step_scheduled);
    assert_eq!(harness.queue.pending_len(harness.endpoint()), 0);

    let body = sink.next_delivery().await;
    assert_eq!(body["reason"], json!("done"));
    assert_eq!(body["status"], json!("running"));
    assert_eq!(body["steps"], json!(1));
}

/// A non-2xx response is logged and swallowed; the step still succeeds
/// and the state still finalizes.
#[tokio::test]
async fn webhook_failure_never_fails_the_step() {
    let mut sink = WebhookSink::start_with_status(500).await;
    let harness = TestHarness::new();
    let operation = harness.seed_with_webhook(sink.url(), None).await;
    harness.executor.script(ScriptedStep::done());

    let result = harness.run_step(operation.operation_id, 0).await.unwrap();
    assert!(result.success);
    assert_eq!(
        harness.state(operation.operation_id).await.status,
        OperationStatus::Done
    );

    // Delivery was attempted exactly once.
    sink.next_delivery().await;
    assert!(sink.try_delivery().is_none());
}

/// An executor failure persists the error, releases the lock, and reports
/// `error` through the webhook with the failure message.
#[tokio::test]
async fn executor_failure_reports_error_through_webhook() {
    let mut sink = WebhookSink::start().await;
    let harness = TestHarness::new();
    let operation = harness.seed_with_webhook(sink.url(), None).await;
    harness
        .executor
        .script(ScriptedStep::Fail("tool exploded".to_string()));

    let error = harness.run_step(operation.operation_id, 0).await.unwrap_err();
    assert!(matches!(error, RuntimeError::Execution(_)));

    let state = harness.state(operation.operation_id).await;
    assert_eq!(state.status, OperationStatus::Error);
    let failure = state.last_error.expect("failure recorded");
    assert_eq!(failure.message, "tool exploded");
    assert!(!harness.lock.is_held(operation.operation_id, 0));
    assert_eq!(harness.queue.pending_len(harness.endpoint()), 0);

    let body = sink.next_delivery().await;
    assert_eq!(body["reason"], json!("error"));
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["error_message"], json!("tool exploded"));
}
