//! Fetcher retry behaviour against a mock server

use crate::common;
use clamber::crawler::FetchResult;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_success_reports_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header_exists("user-agent"))
        .respond_with(common::html("<p>hi</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::fetcher(3).fetch(&format!("{}/page", server.uri())).await;

    match result {
        FetchResult::Success {
            status_code,
            content_type,
            body,
            ..
        } => {
            assert_eq!(status_code, 200);
            assert!(content_type.starts_with("text/html"));
            assert!(body.contains("<p>hi</p>"));
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::fetcher(4).fetch(&format!("{}/missing", server.uri())).await;

    assert!(matches!(result, FetchResult::Terminal { status_code: 404 }));
    assert_eq!(result.status_code(), Some(404));
}

#[tokio::test]
async fn test_server_errors_are_retried_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let result = common::fetcher(3).fetch(&format!("{}/flaky", server.uri())).await;

    assert!(matches!(
        result,
        FetchResult::Exhausted {
            status_code: 503,
            attempts: 3
        }
    ));
}

#[tokio::test]
async fn test_recovers_after_transient_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(common::html("back"))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::fetcher(3)
        .fetch(&format!("{}/recovering", server.uri()))
        .await;

    assert_eq!(result.status_code(), Some(200));
    assert!(result.is_html());
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let result = common::fetcher(3).fetch("http://127.0.0.1:1/").await;

    assert!(matches!(result, FetchResult::Transport { .. }));
    assert_eq!(result.status_code(), None);
}
