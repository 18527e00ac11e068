//! HTTP behavior tests against a local mock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use devchat_sdk::{
    ChatMessage, CompletionClient, CompletionError, CompletionRequest, OpenAiClient, RetryPolicy,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff_min: Duration::from_millis(1),
        backoff_max: Duration::from_millis(2),
    }
}

fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::with_url("test-key", format!("{}/v1/chat/completions", server.uri()))
        .with_retry_policy(fast_retry())
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [
            { "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

#[tokio::test]
async fn returns_generated_text_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "gpt-4" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("hello back")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let answer = client
        .complete(CompletionRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap();
    assert_eq!(answer, "hello back");
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .complete(CompletionRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap_err();
    match err {
        CompletionError::Api { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("invalid api key"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream hiccup"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let answer = client
        .complete(CompletionRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap();
    assert_eq!(answer, "recovered");
}

#[tokio::test]
async fn retry_budget_exhausts_on_persistent_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .complete(CompletionRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap_err();
    match err {
        CompletionError::RetriesExhausted { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choice_list_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .complete(CompletionRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap_err();
    assert!(matches!(err, CompletionError::EmptyResponse));
}
