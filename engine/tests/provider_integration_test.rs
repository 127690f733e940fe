//! Integration tests for the completion backends
//!
//! Each provider is pointed at a wiremock server; the tests check the request
//! shape each wire format expects and the mapping of upstream failures.

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use relay_engine::config::{AnthropicConfig, GroqConfig, OpenAIConfig};
use relay_engine::llm::anthropic::AnthropicProvider;
use relay_engine::llm::groq::GroqProvider;
use relay_engine::llm::openai::OpenAIProvider;
use relay_engine::llm::{BackendError, CompletionBackend, GenerationParams, PERSONA_PROMPT};
use relay_engine::secrets::SecretString;
use sdk::types::ConversationTurn;

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn claude_message(content: &str) -> serde_json::Value {
    json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": content }],
        "stop_reason": "end_turn"
    })
}

fn groq(server: &MockServer) -> GroqProvider {
    let config = GroqConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    GroqProvider::new(&config, SecretString::new("gsk_test"), GenerationParams::default())
}

fn openai(server: &MockServer) -> OpenAIProvider {
    let config = OpenAIConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    OpenAIProvider::new(&config, SecretString::new("sk-test"), GenerationParams::default())
}

fn claude(server: &MockServer) -> AnthropicProvider {
    let config = AnthropicConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    AnthropicProvider::new(config, SecretString::new("sk-ant-test"), GenerationParams::default())
}

fn history() -> Vec<ConversationTurn> {
    vec![
        ConversationTurn::user("Hi"),
        ConversationTurn::assistant("Hello!"),
    ]
}

#[tokio::test]
async fn test_groq_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "stream": false,
            "messages": [
                { "role": "system", "content": PERSONA_PROMPT },
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hello!" },
                { "role": "user", "content": "How are you?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("Fine, thanks.")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = groq(&server).complete("How are you?", &history()).await.unwrap();
    assert_eq!(reply, "Fine, thanks.");
}

#[tokio::test]
async fn test_openai_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("Hola")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = openai(&server).complete("Hola", &[]).await.unwrap();
    assert_eq!(reply, "Hola");
}

#[tokio::test]
async fn test_claude_request_shape() {
    let server = MockServer::start().await;

    // Persona goes out-of-band; system turns never reach `messages`
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "system": PERSONA_PROMPT,
            "messages": [
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hello!" },
                { "role": "user", "content": "How are you?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_message("Fine, thanks.")))
        .expect(1)
        .mount(&server)
        .await;

    let mut turns = vec![ConversationTurn::system("stale instruction")];
    turns.extend(history());

    let reply = claude(&server).complete("How are you?", &turns).await.unwrap();
    assert_eq!(reply, "Fine, thanks.");
}

#[tokio::test]
async fn test_providers_are_interchangeable() {
    let chat_server = MockServer::start().await;
    let claude_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("Same answer")))
        .mount(&chat_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_message("Same answer")))
        .mount(&claude_server)
        .await;

    let backends: Vec<Box<dyn CompletionBackend>> = vec![
        Box::new(groq(&chat_server)),
        Box::new(openai(&chat_server)),
        Box::new(claude(&claude_server)),
    ];

    for backend in &backends {
        let reply = backend.complete("Question", &history()).await.unwrap();
        assert_eq!(reply, "Same answer", "provider {}", backend.name());
    }
}

#[tokio::test]
async fn test_status_mapping() {
    let cases = [
        (401, "auth"),
        (403, "auth"),
        (429, "rate_limited"),
        (500, "unavailable"),
        (503, "unavailable"),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream says no"))
            .mount(&server)
            .await;

        let err = openai(&server).complete("Hi", &[]).await.unwrap_err();
        assert_eq!(err.kind().to_string(), expected, "status {}", status);

        let err = claude(&server).complete("Hi", &[]).await.unwrap_err();
        assert_eq!(err.kind().to_string(), expected, "status {}", status);
    }
}

#[tokio::test]
async fn test_malformed_responses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    assert!(matches!(
        groq(&server).complete("Hi", &[]).await,
        Err(BackendError::MalformedResponse(_))
    ));
    assert!(matches!(
        claude(&server).complete("Hi", &[]).await,
        Err(BackendError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_unreachable_upstream_is_unavailable() {
    // Nothing listens here once the server is dropped
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let config = GroqConfig {
        base_url: uri,
        ..Default::default()
    };
    let provider = GroqProvider::new(&config, SecretString::new("k"), GenerationParams::default());

    assert!(matches!(
        provider.complete("Hi", &[]).await,
        Err(BackendError::Unavailable(_))
    ));
}
