//! Integration tests for progress reporting over HTTP.

use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;
use studytimer_core::{
    CompletionHandler, CompletionOutcome, HttpProgressReporter, ProgressReporter, ReportingError,
    StaticTokenProvider,
};

#[tokio::test]
async fn test_patch_sends_increment_with_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/study-plan-day/d1/progress")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::Json(json!({ "studied_minutes": 7 })))
        .with_status(200)
        .create_async()
        .await;

    let reporter = HttpProgressReporter::new(&server.url(), Duration::from_secs(5)).unwrap();
    reporter.report_progress("secret", "d1", 7).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PATCH", "/study-plan-day/d1/progress")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let reporter = HttpProgressReporter::new(&server.url(), Duration::from_secs(5)).unwrap();
    match reporter.report_progress("secret", "d1", 1).await {
        Err(ReportingError::Rejected { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn test_completion_handler_reports_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/study-plan-day/d9/progress")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let reporter = Arc::new(HttpProgressReporter::new(&server.url(), Duration::from_secs(5)).unwrap());
    let tokens = Arc::new(StaticTokenProvider::new(Some("tok".into())));
    let handler = CompletionHandler::new(tokens, reporter);

    assert_eq!(
        handler.finish("d9", 0).await.unwrap(),
        CompletionOutcome::NothingToReport
    );
    assert_eq!(
        handler.finish("d9", 4).await.unwrap(),
        CompletionOutcome::Reported { minutes: 4 }
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    // Port 9 (discard) on localhost is not expected to accept HTTP.
    let reporter =
        HttpProgressReporter::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    assert!(matches!(
        reporter.report_progress("tok", "d1", 1).await,
        Err(ReportingError::Network(_))
    ));
}
