//! Integration tests for the OpenRouter provider against a mock server

use colloquy::config::OpenRouterConfig;
use colloquy::provider::{ChatProvider, ChatRequest, OpenRouterProvider, StreamEvent, WireMessage};
use futures::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> OpenRouterProvider {
    OpenRouterProvider::new_with_key(
        OpenRouterConfig {
            api_base: format!("{}/v1", server.uri()),
            ..Default::default()
        },
        "test-key",
    )
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "openai/gpt-4o-mini".to_string(),
        system_prompt: "be helpful".to_string(),
        messages: vec![WireMessage::new("user", "Hello")],
    }
}

async fn collect(provider: &OpenRouterProvider) -> Vec<StreamEvent> {
    let mut stream = provider
        .stream_chat(request())
        .await
        .expect("stream should open");
    let mut events = Vec::new();
    while let Some(item) = stream.next().await {
        events.push(item.expect("event should be ok"));
    }
    events
}

#[tokio::test]
async fn test_streaming_deltas_and_done() {
    let server = MockServer::start().await;

    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
               data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
               data: [DONE]\n\n";

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "openai/gpt-4o-mini",
            "stream": true,
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let events = collect(&provider_for(&server)).await;
    assert_eq!(
        events,
        vec![
            StreamEvent::TextDelta("Hel".to_string()),
            StreamEvent::TextDelta("lo".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_system_prompt_is_first_wire_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                { "role": "system", "content": "be helpful" },
                { "role": "user", "content": "Hello" },
            ],
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"data: [DONE]\n\n".as_slice(), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let events = collect(&provider_for(&server)).await;
    assert_eq!(events, vec![StreamEvent::Done]);
}

#[tokio::test]
async fn test_reasoning_deltas_are_forwarded() {
    let server = MockServer::start().await;

    let sse = "data: {\"choices\":[{\"delta\":{\"reasoning\":\"thinking\"}}]}\n\n\
               data: {\"choices\":[{\"delta\":{\"content\":\"answer\"}}]}\n\n\
               data: [DONE]\n\n";

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let events = collect(&provider_for(&server)).await;
    assert_eq!(
        events,
        vec![
            StreamEvent::ReasoningDelta("thinking".to_string()),
            StreamEvent::TextDelta("answer".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_unauthorized_is_an_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let result = provider_for(&server).stream_chat(request()).await;
    let error = match result {
        Ok(_) => panic!("401 should fail the call"),
        Err(e) => e,
    };
    assert!(error.to_string().contains("Authentication error"));
}

#[tokio::test]
async fn test_server_error_is_a_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = provider_for(&server).stream_chat(request()).await;
    let error = match result {
        Ok(_) => panic!("500 should fail the call"),
        Err(e) => e,
    };
    assert!(error.to_string().contains("Provider error"));
    assert!(error.to_string().contains("boom"));
}

#[tokio::test]
async fn test_mid_stream_error_event_surfaces_as_err_item() {
    let server = MockServer::start().await;

    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n\
               data: {\"error\":{\"message\":\"rate limited\"}}\n\n";

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let mut stream = provider
        .stream_chat(request())
        .await
        .expect("stream should open");

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first, StreamEvent::TextDelta("par".to_string()));

    let second = stream.next().await.unwrap();
    let error = second.expect_err("error chunk should surface");
    assert!(error.to_string().contains("rate limited"));
}

#[tokio::test]
async fn test_stream_without_done_marker_still_completes() {
    let server = MockServer::start().await;

    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"all of it\"}}]}\n\n";

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let events = collect(&provider_for(&server)).await;
    assert_eq!(
        events,
        vec![
            StreamEvent::TextDelta("all of it".to_string()),
            StreamEvent::Done,
        ]
    );
}
