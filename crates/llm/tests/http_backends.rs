//! HTTP contract tests for the chat/vision backends against a mock server

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use safespace_core::{CapabilityRequest, Error, Message, Provider, ProviderContent};
use safespace_llm::{OllamaBackend, OllamaConfig, OpenAiCompatibleBackend, OpenAiCompatibleConfig};

fn openai_backend(server: &MockServer) -> OpenAiCompatibleBackend {
    let config = OpenAiCompatibleConfig {
        endpoint: server.uri(),
        timeout: Duration::from_secs(5),
        ..OpenAiCompatibleConfig::openai("sk-test")
    };
    OpenAiCompatibleBackend::new(config).unwrap()
}

#[tokio::test]
async fn test_chat_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "  I'm here with you.  " },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = openai_backend(&server);
    let request = CapabilityRequest::Chat {
        messages: vec![Message::system("be kind"), Message::user("hello")],
    };

    let content = backend.call(&request).await.unwrap();
    assert_eq!(content, ProviderContent::text("I'm here with you."));
}

#[tokio::test]
async fn test_vision_sends_data_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "A quiet beach at sunset." }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = openai_backend(&server);
    let request = CapabilityRequest::Vision {
        image: vec![0x89, 0x50, 0x4e, 0x47],
        mime_type: "image/png".to_string(),
        prompt: "Describe".to_string(),
    };

    let content = backend.call(&request).await.unwrap();
    assert_eq!(content.as_text(), Some("A quiet beach at sunset."));

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    let url = body["messages"][0]["content"][1]["image_url"]["url"].as_str().unwrap();
    assert_eq!(url, "data:image/png;base64,iVBORw==");
}

#[tokio::test]
async fn test_http_error_is_provider_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let backend = openai_backend(&server);
    let request = CapabilityRequest::Chat {
        messages: vec![Message::user("hello")],
    };

    match backend.call(&request).await {
        Err(Error::ProviderUnavailable { provider, message }) => {
            assert_eq!(provider, "openai");
            assert!(message.contains("429"));
        }
        other => panic!("expected provider failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_choices_is_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let backend = openai_backend(&server);
    let request = CapabilityRequest::Chat {
        messages: vec![Message::user("hello")],
    };
    assert!(backend.call(&request).await.is_err());
}

#[tokio::test]
async fn test_unsupported_capability_is_rejected_without_http() {
    let server = MockServer::start().await;
    let backend = openai_backend(&server);

    let request = CapabilityRequest::Synthesize {
        text: "hi".to_string(),
        voice: None,
        language: "en".to_string(),
    };
    assert!(backend.call(&request).await.is_err());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ollama_chat() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "alibayram/medgemma:4b",
            "stream": false,
            "options": { "num_predict": 350 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "alibayram/medgemma:4b",
            "message": { "role": "assistant", "content": "That sounds really hard." },
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OllamaBackend::new(OllamaConfig {
        endpoint: server.uri(),
        ..OllamaConfig::default()
    })
    .unwrap();

    let request = CapabilityRequest::Chat {
        messages: vec![Message::user("I had a rough day")],
    };
    let content = backend.call(&request).await.unwrap();
    assert_eq!(content.as_text(), Some("That sounds really hard."));
}
