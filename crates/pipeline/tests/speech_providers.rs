//! HTTP contract tests for the speech providers against a mock server

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use safespace_core::{CapabilityRequest, Error, Provider, ProviderContent};
use safespace_pipeline::{
    ElevenLabsConfig, ElevenLabsTts, GoogleTts, GoogleTtsConfig, WhisperConfig, WhisperStt,
};

fn transcribe_request() -> CapabilityRequest {
    CapabilityRequest::Transcribe {
        audio: b"RIFF....WAVE".to_vec(),
        format: "wav".to_string(),
        language: Some("en".to_string()),
    }
}

fn whisper(server: &MockServer) -> WhisperStt {
    WhisperStt::new(WhisperConfig {
        endpoint: server.uri(),
        timeout: Duration::from_secs(5),
        ..WhisperConfig::groq("gsk-test")
    })
    .unwrap()
}

#[tokio::test]
async fn test_whisper_transcription() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .and(header("authorization", "Bearer gsk-test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "text": " I feel so alone lately. " })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stt = whisper(&server);
    let content = stt.call(&transcribe_request()).await.unwrap();
    assert_eq!(content, ProviderContent::text("I feel so alone lately."));

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("whisper-large-v3"));
    assert!(body.contains("filename=\"audio.wav\""));
}

#[tokio::test]
async fn test_whisper_blank_transcript_is_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "   " })))
        .mount(&server)
        .await;

    let stt = whisper(&server);
    match stt.call(&transcribe_request()).await {
        Err(Error::ProviderUnavailable { provider, message }) => {
            assert_eq!(provider, "groq");
            assert!(message.contains("unintelligible"));
        }
        other => panic!("expected provider failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_elevenlabs_synthesis() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/custom-voice"))
        .and(header("xi-api-key", "el-test"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfb, 0x90]))
        .expect(1)
        .mount(&server)
        .await;

    let tts = ElevenLabsTts::new(ElevenLabsConfig {
        endpoint: server.uri(),
        api_key: "el-test".to_string(),
        ..ElevenLabsConfig::default()
    })
    .unwrap();

    let request = CapabilityRequest::Synthesize {
        text: "Take a slow breath with me.".to_string(),
        voice: Some("custom-voice".to_string()),
        language: "en".to_string(),
    };

    match tts.call(&request).await.unwrap() {
        ProviderContent::Audio { data, mime_type } => {
            assert_eq!(data, vec![0xff, 0xfb, 0x90]);
            assert_eq!(mime_type, "audio/mpeg");
        }
        other => panic!("expected audio, got {:?}", other),
    }
}

#[tokio::test]
async fn test_google_tts_concatenates_chunks() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .and(query_param("idx", "0"))
        .and(query_param("client", "tw-ob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 1]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .and(query_param("idx", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2, 2]))
        .mount(&server)
        .await;

    let tts = GoogleTts::new(GoogleTtsConfig {
        endpoint: server.uri(),
        ..GoogleTtsConfig::default()
    })
    .unwrap();

    let text = "breathe ".repeat(20);
    let audio = tts.synthesize(&text, None).await.unwrap();
    assert_eq!(audio, vec![1, 1, 2, 2]);
}

#[tokio::test]
async fn test_google_tts_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tts = GoogleTts::new(GoogleTtsConfig {
        endpoint: server.uri(),
        ..GoogleTtsConfig::default()
    })
    .unwrap();

    let request = CapabilityRequest::Synthesize {
        text: "hello".to_string(),
        voice: None,
        language: "en".to_string(),
    };
    assert!(matches!(
        tts.call(&request).await,
        Err(Error::ProviderUnavailable { .. })
    ));
}
