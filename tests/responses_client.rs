use std::time::Duration;

use civicscape_chat::llm::{CompletionClient, CompletionError, CompletionSettings, ResponsesClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout: Duration) -> ResponsesClient {
    ResponsesClient::new(CompletionSettings {
        base_url: server.uri(),
        api_key: Some("sk-test".to_string()),
        prompt_id: "pmpt_abc".to_string(),
        model: None,
        timeout,
    })
    .expect("client")
}

#[tokio::test]
async fn test_sends_prompt_reference_and_reads_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "prompt": { "id": "pmpt_abc" },
            "input": "User: a\nAssistant: b\n\nUser: c"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp_1",
            "object": "response",
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "output_text", "text": " done \n", "annotations": [] }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let text = client
        .complete("User: a\nAssistant: b\n\nUser: c")
        .await
        .unwrap();

    // Trimming belongs to the conversation layer.
    assert_eq!(text, " done \n");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    match client.complete("hi").await {
        Err(CompletionError::Status { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_output_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    assert!(matches!(
        client.complete("hi").await,
        Err(CompletionError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    assert!(matches!(
        client.complete("hi").await,
        Err(CompletionError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "output_text": "late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_millis(200));
    let err = client.complete("hi").await.unwrap_err();
    assert!(matches!(&err, CompletionError::Http(e) if e.is_timeout()), "{err:?}");
    assert!(err.user_message().contains("too long"));
}
