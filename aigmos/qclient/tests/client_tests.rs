//! Protocol tests for the Q job client against a mock service.

use std::sync::atomic::{AtomicU32, Ordering};

use qclient::{ChatMessage, ChatOptions, QChat, QConfig, QError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(server: &MockServer) -> QConfig {
    QConfig {
        base_url: server.uri(),
        timeout_ms: 2_000,
        poll_interval_ms: 5,
        model: "test-model".to_string(),
    }
}

async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "job-1"})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn chat_returns_assistant_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .and(body_partial_json(json!({
            "op": "llm.chat",
            "args": {
                "messages": [{"role": "user", "content": "hello"}],
                "model": "test-model"
            },
            "trace_id": "t-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"state": "ok", "result": {"text": "hi there"}})),
        )
        .mount(&server)
        .await;

    let q = QChat::new(fast_config(&server)).expect("client");
    let options = ChatOptions {
        trace_id: Some("t-1".to_string()),
        ..ChatOptions::default()
    };
    let text = q
        .chat(&[ChatMessage::user("hello")], &options)
        .await
        .expect("chat");
    assert_eq!(text, "hi there");
}

#[tokio::test]
async fn chat_keeps_polling_until_job_settles() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    let polls = AtomicU32::new(0);
    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(move |_: &wiremock::Request| {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                ResponseTemplate::new(200).set_body_json(json!({"state": "running"}))
            } else {
                ResponseTemplate::new(200)
                    .set_body_json(json!({"state": "ok", "result": {"text": "done"}}))
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let q = QChat::new(fast_config(&server)).expect("client");
    let text = q
        .chat(&[ChatMessage::user("x")], &ChatOptions::default())
        .await
        .expect("chat");
    assert_eq!(text, "done");
}

#[tokio::test]
async fn failed_job_reports_code_and_cancels() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "fail",
            "error": {"code": "E_MODEL", "message": "model unavailable"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs/job-1/cancel"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let q = QChat::new(fast_config(&server)).expect("client");
    let err = q
        .chat(&[ChatMessage::user("x")], &ChatOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "E_MODEL: model unavailable");
}

#[tokio::test]
async fn ok_without_text_is_malformed() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "ok"})))
        .mount(&server)
        .await;

    let q = QChat::new(fast_config(&server)).expect("client");
    let err = q
        .chat(&[ChatMessage::user("x")], &ChatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QError::Malformed(_)));
}

#[tokio::test]
async fn deadline_times_out_and_cancels() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "queued"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs/job-1/cancel"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let q = QChat::new(fast_config(&server)).expect("client");
    let options = ChatOptions {
        timeout_ms: Some(40),
        ..ChatOptions::default()
    };
    let err = q
        .chat(&[ChatMessage::user("x")], &options)
        .await
        .unwrap_err();
    assert!(matches!(err, QError::Timeout));
}

#[tokio::test]
async fn submit_rejection_includes_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let q = QChat::new(fast_config(&server)).expect("client");
    let err = q
        .chat(&[ChatMessage::user("x")], &ChatOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "submit failed: HTTP 500 :: overloaded");
}

#[test]
fn blocking_bridge_runs_outside_async_context() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(async {
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/job-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"state": "ok", "result": {"text": "sync"}})),
            )
            .mount(&server)
            .await;
    });

    let q = QChat::new(fast_config(&server)).expect("client");
    let text = q
        .chat_blocking(&[ChatMessage::user("x")], &ChatOptions::default())
        .expect("chat");
    assert_eq!(text, "sync");
}
