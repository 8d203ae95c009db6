//! HTTP Endpoints
//!
//! REST API for SafeSpace interactions.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tokio::task::JoinHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use safespace_agent::{
    InteractionRequest, InteractionResponse, MultimodalRequest, MultimodalResponse,
};

use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::{status_for, ServerError};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.settings.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let body_limit = server.max_body_bytes;

    Router::new()
        // Interactions
        .route("/api/sessions/:id/text", post(text_interaction))
        .route("/api/sessions/:id/image", post(image_interaction))
        .route("/api/sessions/:id/audio", post(audio_interaction))
        .route("/api/sessions/:id/multimodal", post(multimodal_interaction))
        // Session state
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id/history", get(session_history))
        .route("/api/sessions/:id", delete(clear_session))
        // Speech synthesis
        .route("/api/voice", post(synthesize_voice))
        // System
        .route("/api/system/status", get(system_status))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer
///
/// - disabled: no cross-origin access
/// - enabled with no origins: any origin
/// - otherwise the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    if !enabled {
        return CorsLayer::new();
    }

    if origins.is_empty() {
        tracing::warn!("No CORS origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods(methods)
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
struct TextBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ImageBody {
    image_base64: String,
    mime_type: String,
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AudioBody {
    audio_base64: String,
    format: String,
}

#[derive(Debug, Deserialize)]
struct MultimodalBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    image: Option<ImageBody>,
    #[serde(default)]
    audio: Option<AudioBody>,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServerError::InvalidRequest(rejection.body_text()))
}

fn decode_base64(field: &str, data: &str) -> Result<Vec<u8>, ServerError> {
    BASE64
        .decode(data.trim())
        .map_err(|e| ServerError::InvalidRequest(format!("{} is not valid base64: {}", field, e)))
}

async fn text_interaction(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<TextBody>, JsonRejection>,
) -> Response {
    let request = match json_body(body) {
        Ok(body) => InteractionRequest::text(session_id, body.message),
        Err(e) => return rejected("text", e),
    };
    run_interaction(state, "text", request).await
}

async fn image_interaction(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<ImageBody>, JsonRejection>,
) -> Response {
    let request = json_body(body).and_then(|body| {
        let data = decode_base64("image_base64", &body.image_base64)?;
        Ok(InteractionRequest::image(
            session_id,
            data,
            body.mime_type,
            body.prompt.filter(|p| !p.trim().is_empty()),
        ))
    });
    match request {
        Ok(request) => run_interaction(state, "image", request).await,
        Err(e) => rejected("image", e),
    }
}

async fn audio_interaction(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<AudioBody>, JsonRejection>,
) -> Response {
    let request = json_body(body).and_then(|body| {
        let data = decode_base64("audio_base64", &body.audio_base64)?;
        Ok(InteractionRequest::audio(session_id, data, body.format))
    });
    match request {
        Ok(request) => run_interaction(state, "audio", request).await,
        Err(e) => rejected("audio", e),
    }
}

async fn multimodal_interaction(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<MultimodalBody>, JsonRejection>,
) -> Response {
    let request = json_body(body).and_then(|body| {
        let mut request = MultimodalRequest::new(session_id);
        request.text = body.text;
        if let Some(image) = body.image {
            let data = decode_base64("image.image_base64", &image.image_base64)?;
            let prompt = image.prompt.filter(|p| !p.trim().is_empty());
            request = request.with_image(data, image.mime_type, prompt);
        }
        if let Some(audio) = body.audio {
            let data = decode_base64("audio.audio_base64", &audio.audio_base64)?;
            request = request.with_audio(data, audio.format);
        }
        Ok(request)
    });
    let request = match request {
        Ok(request) => request,
        Err(e) => return rejected("multimodal", e),
    };

    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.handle_multimodal(request).await });
    let response = match await_task(&state, task).await {
        Ok(response) => response,
        Err(e) => return rejected("multimodal", e),
    };

    let status = match &response {
        MultimodalResponse::Success(_) => StatusCode::OK,
        MultimodalResponse::Error(failure) => status_for(&failure.error),
    };
    record_request("multimodal", status);
    (status, Json(response)).into_response()
}

fn rejected(endpoint: &'static str, error: ServerError) -> Response {
    tracing::debug!(endpoint, error = %error, "Rejected request");
    let response = error.into_response();
    record_request(endpoint, response.status());
    response
}

/// Wait for a spawned handler task, bounded by `server.timeout_seconds`
///
/// On expiry the task is detached rather than aborted, so provider calls
/// already in flight finish and are recorded in the session.
async fn await_task<T>(state: &AppState, task: JoinHandle<T>) -> Result<T, ServerError> {
    let deadline = Duration::from_secs(state.settings.server.timeout_seconds);
    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Handler task failed");
            Err(ServerError::Internal(e.to_string()))
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = deadline.as_secs(),
                "Handler task still running at deadline, responding with timeout"
            );
            Err(ServerError::Timeout(format!(
                "no response within {} s",
                deadline.as_secs()
            )))
        }
    }
}

/// Run one interaction in its own task
///
/// A client disconnect drops this future but not the spawned task, so
/// provider calls already in flight finish and are recorded.
async fn run_interaction(
    state: AppState,
    endpoint: &'static str,
    request: InteractionRequest,
) -> Response {
    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.handle(request).await });

    let response = match await_task(&state, task).await {
        Ok(response) => response,
        Err(e) => return rejected(endpoint, e),
    };

    let status = match &response {
        InteractionResponse::Success(_) => StatusCode::OK,
        InteractionResponse::Error(failure) => status_for(&failure.error),
    };
    record_request(endpoint, status);
    (status, Json(response)).into_response()
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions().list();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ServerError> {
    let record = state
        .sessions()
        .snapshot(&session_id)
        .ok_or(ServerError::SessionNotFound(session_id))?;
    Ok(Json(record).into_response())
}

async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ServerError> {
    let summary = state
        .sessions()
        .clear(&session_id)
        .ok_or(ServerError::SessionNotFound(session_id))?;
    Ok(Json(summary).into_response())
}

#[derive(Debug, Deserialize)]
struct VoiceBody {
    text: String,
    #[serde(default)]
    premium: bool,
    #[serde(default)]
    voice_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct VoiceResponse {
    audio_base64: String,
    mime_type: String,
    provider: String,
}

async fn synthesize_voice(
    State(state): State<AppState>,
    body: Result<Json<VoiceBody>, JsonRejection>,
) -> Result<Json<VoiceResponse>, ServerError> {
    let body = json_body(body)?;
    let orchestrator = state.orchestrator.clone();

    let task = tokio::spawn(async move {
        orchestrator
            .synthesize(
                body.session_id.as_deref(),
                &body.text,
                body.premium,
                body.voice_id,
            )
            .await
    });

    let result = await_task(&state, task)
        .await
        .and_then(|result| result.map_err(ServerError::from));

    match result {
        Ok(reply) => {
            record_request("voice", StatusCode::OK);
            Ok(Json(VoiceResponse {
                audio_base64: BASE64.encode(&reply.audio),
                mime_type: reply.mime_type,
                provider: reply.provider,
            }))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Speech synthesis failed");
            record_request("voice", e.status());
            Err(e)
        }
    }
}

async fn system_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let providers: serde_json::Map<String, serde_json::Value> = state
        .orchestrator
        .registry()
        .configured()
        .into_iter()
        .map(|(capability, names)| (capability.to_string(), serde_json::json!(names)))
        .collect();

    Json(serde_json::json!({
        "environment": state.settings.environment,
        "providers": providers,
        "notifier": state.orchestrator.notifier_name(),
        "active_sessions": state.sessions().count(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use safespace_agent::ProviderRegistry;
    use safespace_config::Settings;
    use safespace_core::{Capability, CapabilityRequest, Error, Provider, ProviderContent};
    use safespace_tools::SimulatedNotifier;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Canned {
        name: &'static str,
        capability: [Capability; 1],
        fail: bool,
    }

    #[async_trait]
    impl Provider for Canned {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> &[Capability] {
            &self.capability
        }

        async fn call(
            &self,
            request: &CapabilityRequest,
        ) -> safespace_core::Result<ProviderContent> {
            if self.fail {
                return Err(Error::provider(self.name, "HTTP 503"));
            }
            Ok(match request {
                CapabilityRequest::Synthesize { .. } => ProviderContent::Audio {
                    data: b"ID3".to_vec(),
                    mime_type: "audio/mpeg".to_string(),
                },
                CapabilityRequest::Transcribe { .. } => ProviderContent::text("I feel okay today"),
                CapabilityRequest::Vision { .. } => ProviderContent::text("A calm lake."),
                CapabilityRequest::Chat { .. } => ProviderContent::text("Thank you for sharing."),
            })
        }
    }

    /// Never answers within any configured timeout
    struct Stalled;

    #[async_trait]
    impl Provider for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn capabilities(&self) -> &[Capability] {
            &[Capability::Chat]
        }

        async fn call(
            &self,
            _request: &CapabilityRequest,
        ) -> safespace_core::Result<ProviderContent> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ProviderContent::text("too late"))
        }
    }

    fn provider(name: &'static str, capability: Capability) -> Arc<dyn Provider> {
        Arc::new(Canned {
            name,
            capability: [capability],
            fail: false,
        })
    }

    fn app_with(registry: ProviderRegistry) -> Router {
        let state = AppState::new(
            Settings::default(),
            registry,
            Arc::new(SimulatedNotifier::new()),
        );
        create_router(state)
    }

    fn app() -> Router {
        app_with(
            ProviderRegistry::new()
                .with(Capability::Chat, provider("openai", Capability::Chat))
                .with(Capability::Vision, provider("openai", Capability::Vision))
                .with(Capability::SpeechToText, provider("groq", Capability::SpeechToText))
                .with(Capability::TextToSpeech, provider("google", Capability::TextToSpeech)),
        )
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[test]
    fn test_router_creation() {
        let _ = app();
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = send(&app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_text_interaction() {
        let app = app();
        let (status, json) = send(
            &app,
            post_json("/api/sessions/s1/text", serde_json::json!({ "message": "hello there" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["content"], "Thank you for sharing.");
        assert_eq!(json["risk"]["level"], "none");
        assert_eq!(json["escalation"]["kind"], "none");
        assert_eq!(json["stages"][4], "responded");

        let (status, json) = send(&app, get("/api/sessions/s1/history")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["interactions"].as_array().unwrap().len(), 1);
        assert_eq!(json["turns"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_high_risk_text_reports_notification() {
        let (status, json) = send(
            &app(),
            post_json(
                "/api/sessions/s1/text",
                serde_json::json!({ "message": "I want to die" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["risk"]["level"], "high");
        assert_eq!(json["escalation"]["kind"], "notify_emergency_contact");
        assert_eq!(json["notification"]["status"], "sent");
        assert_eq!(json["notification"]["receipt"]["simulated"], true);
    }

    #[tokio::test]
    async fn test_blank_message_is_bad_request() {
        let (status, json) = send(
            &app(),
            post_json("/api/sessions/s1/text", serde_json::json!({ "message": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "malformed_payload");
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let (status, json) = send(
            &app(),
            post_json("/api/sessions/s1/text", serde_json::json!({ "text": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "malformed_payload");
    }

    #[tokio::test]
    async fn test_invalid_base64_is_bad_request() {
        let (status, json) = send(
            &app(),
            post_json(
                "/api/sessions/s1/image",
                serde_json::json!({ "image_base64": "not base64!!", "mime_type": "image/png" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("image_base64"));
    }

    #[tokio::test]
    async fn test_image_and_audio_interactions() {
        let app = app();
        let (status, json) = send(
            &app,
            post_json(
                "/api/sessions/s1/image",
                serde_json::json!({
                    "image_base64": BASE64.encode([0x89, 0x50, 0x4E]),
                    "mime_type": "image/png"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["modality"], "image");

        let (status, json) = send(
            &app,
            post_json(
                "/api/sessions/s1/audio",
                serde_json::json!({ "audio_base64": BASE64.encode([1, 2, 3]), "format": "wav" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["transcript"], "I feel okay today");
    }

    #[tokio::test]
    async fn test_exhausted_providers_is_service_unavailable() {
        let app = app_with(ProviderRegistry::new().with(
            Capability::Chat,
            Arc::new(Canned {
                name: "openai",
                capability: [Capability::Chat],
                fail: true,
            }),
        ));
        let (status, json) = send(
            &app,
            post_json("/api/sessions/s1/text", serde_json::json!({ "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["kind"], "all_providers_exhausted");
        assert_eq!(json["stages"].as_array().unwrap().last().unwrap(), "failed");
    }

    #[tokio::test]
    async fn test_session_listing_and_clear() {
        let app = app();
        send(
            &app,
            post_json("/api/sessions/abc/text", serde_json::json!({ "message": "hi" })),
        )
        .await;

        let (_, json) = send(&app, get("/api/sessions")).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["sessions"][0], "abc");

        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/sessions/abc")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["interaction_count"], 1);

        let (status, json) = send(&app, get("/api/sessions/abc/history")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["kind"], "session_not_found");
    }

    #[tokio::test]
    async fn test_voice_synthesis() {
        let (status, json) = send(
            &app(),
            post_json("/api/voice", serde_json::json!({ "text": "You are not alone." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["provider"], "google");
        assert_eq!(json["audio_base64"], BASE64.encode(b"ID3"));
    }

    #[tokio::test]
    async fn test_system_status() {
        let (status, json) = send(&app(), get("/api/system/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["providers"]["chat"][0], "openai");
        assert_eq!(json["notifier"], "simulated");
        assert_eq!(json["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_metrics_disabled_without_recorder() {
        let response = app().oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_chain_times_out_with_typed_body() {
        // Five chat attempts at 30 s each outlast the 120 s request deadline
        let mut registry = ProviderRegistry::new();
        for _ in 0..5 {
            registry = registry.with(Capability::Chat, Arc::new(Stalled));
        }
        let state = AppState::new(
            Settings::default(),
            registry,
            Arc::new(SimulatedNotifier::new()),
        );
        let sessions = state.orchestrator.sessions().clone();
        let app = create_router(state);

        let (status, json) = send(
            &app,
            post_json("/api/sessions/s1/text", serde_json::json!({ "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "timeout");
        assert!(json["message"].as_str().unwrap().contains("120 s"));

        // The interaction keeps running and every attempt is still recorded
        tokio::time::sleep(Duration::from_secs(60)).await;
        let attempts = sessions.provider_results("s1");
        assert_eq!(attempts.len(), 5);
        assert!(attempts.iter().all(|a| !a.success));
    }

    #[tokio::test]
    async fn test_voice_with_unknown_session_creates_nothing() {
        let app = app();
        let (status, _) = send(
            &app,
            post_json(
                "/api/voice",
                serde_json::json!({ "text": "hi", "session_id": "ghost" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, json) = send(&app, get("/api/sessions")).await;
        assert_eq!(json["count"], 0);
        let (_, json) = send(&app, get("/api/system/status")).await;
        assert_eq!(json["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_multimodal_interaction() {
        let app = app();
        let (status, json) = send(
            &app,
            post_json(
                "/api/sessions/s1/multimodal",
                serde_json::json!({
                    "text": "hello",
                    "image": {
                        "image_base64": BASE64.encode([0x89, 0x50, 0x4E]),
                        "mime_type": "image/png"
                    },
                    "audio": { "audio_base64": BASE64.encode([1, 2, 3]), "format": "wav" }
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["parts"].as_array().unwrap().len(), 3);
        assert_eq!(json["parts"][0]["modality"], "image");
        assert_eq!(json["transcript"], "I feel okay today");
        assert_eq!(json["risk"]["level"], "none");
        assert_eq!(json["emergency_flag"], false);
        assert!(json["content"]
            .as_str()
            .unwrap()
            .starts_with("Image: Thank you for sharing."));

        let (_, json) = send(&app, get("/api/sessions/s1/history")).await;
        assert_eq!(json["interactions"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_multimodal_rejections() {
        let app = app();
        let (status, json) = send(
            &app,
            post_json(
                "/api/sessions/s1/multimodal",
                serde_json::json!({ "audio": { "audio_base64": "%%%", "format": "wav" } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("audio.audio_base64"));

        let (status, json) = send(
            &app,
            post_json("/api/sessions/s1/multimodal", serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "malformed_payload");
    }
}
