//! Interaction orchestrator
//!
//! Drives one interaction through
//! `received → risk_assessed → escalation_decided → dispatched_to_ai → responded`,
//! or to `failed` from any stage. Failures come back as a typed response,
//! never as a raw error.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use safespace_config::providers::ELEVENLABS;
use safespace_config::{PersonaConfig, Settings};
use safespace_core::{
    Capability, CapabilityRequest, ConversationTurn, EmergencyAlert, EmergencyNotifier, Error,
    EscalationAction, Interaction, Modality, NotificationReceipt, Payload, Provider,
    ProviderContent, Result, RiskAssessment, RiskLevel,
};
use safespace_llm::PromptBuilder;

use crate::crisis::CrisisDetector;
use crate::dispatcher::Dispatcher;
use crate::escalation::{resource_block, EscalationPolicy};
use crate::metrics;
use crate::registry::ProviderRegistry;
use crate::session::{SessionEntry, SessionStore};
use crate::validation::{validate_payload, validate_session_id, validate_synthesis_text};

/// Lifecycle stage of one interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStage {
    Received,
    RiskAssessed,
    EscalationDecided,
    DispatchedToAi,
    Responded,
    Failed,
}

/// Typed inbound request
#[derive(Debug, Clone)]
pub struct InteractionRequest {
    pub session_id: String,
    pub payload: Payload,
}

impl InteractionRequest {
    pub fn new(session_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            session_id: session_id.into(),
            payload,
        }
    }

    pub fn text(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            session_id,
            Payload::Text {
                message: message.into(),
            },
        )
    }

    pub fn image(
        session_id: impl Into<String>,
        data: Vec<u8>,
        mime_type: impl Into<String>,
        prompt: Option<String>,
    ) -> Self {
        Self::new(
            session_id,
            Payload::Image {
                data,
                mime_type: mime_type.into(),
                prompt,
            },
        )
    }

    pub fn audio(session_id: impl Into<String>, data: Vec<u8>, format: impl Into<String>) -> Self {
        Self::new(
            session_id,
            Payload::Audio {
                data,
                format: format.into(),
            },
        )
    }
}

/// What happened when the emergency contact was notified
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent {
        receipt: NotificationReceipt,
    },
    Failed {
        error: String,
        /// Instruction shown to the user
        guidance: String,
    },
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionReply {
    pub session_id: String,
    pub interaction_id: Uuid,
    pub modality: Modality,
    pub content: String,
    pub risk: RiskAssessment,
    pub escalation: EscalationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationOutcome>,
    /// Speech-to-text output for audio interactions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Chat provider that produced the reply
    pub provider: String,
    pub stages: Vec<InteractionStage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionFailure {
    pub session_id: String,
    pub kind: &'static str,
    /// Human-readable message for the user
    pub message: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationOutcome>,
    pub stages: Vec<InteractionStage>,
    #[serde(skip)]
    pub error: Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InteractionResponse {
    Success(InteractionReply),
    Error(InteractionFailure),
}

impl InteractionResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, InteractionResponse::Success(_))
    }

    pub fn reply(&self) -> Option<&InteractionReply> {
        match self {
            InteractionResponse::Success(reply) => Some(reply),
            InteractionResponse::Error(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&InteractionFailure> {
        match self {
            InteractionResponse::Success(_) => None,
            InteractionResponse::Error(failure) => Some(failure),
        }
    }

    pub fn stages(&self) -> &[InteractionStage] {
        match self {
            InteractionResponse::Success(reply) => &reply.stages,
            InteractionResponse::Error(failure) => &failure.stages,
        }
    }

    /// Risk assessment, if the interaction got far enough to be assessed
    pub fn risk(&self) -> Option<&RiskAssessment> {
        match self {
            InteractionResponse::Success(reply) => Some(&reply.risk),
            InteractionResponse::Error(failure) => failure.risk.as_ref(),
        }
    }

    /// Reply text, or the user-facing failure message
    pub fn message(&self) -> &str {
        match self {
            InteractionResponse::Success(reply) => &reply.content,
            InteractionResponse::Error(failure) => &failure.message,
        }
    }

    fn into_failure(self) -> Option<InteractionFailure> {
        match self {
            InteractionResponse::Success(_) => None,
            InteractionResponse::Error(failure) => Some(failure),
        }
    }
}

/// Image part of a multimodal request
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub prompt: Option<String>,
}

/// Audio part of a multimodal request
#[derive(Debug, Clone)]
pub struct AudioPart {
    pub data: Vec<u8>,
    pub format: String,
}

/// Image, audio and text submitted together
///
/// Each part present runs as its own interaction, in the order image,
/// audio, text. A blank text part counts as absent.
#[derive(Debug, Clone, Default)]
pub struct MultimodalRequest {
    pub session_id: String,
    pub text: Option<String>,
    pub image: Option<ImagePart>,
    pub audio: Option<AudioPart>,
}

impl MultimodalRequest {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_image(
        mut self,
        data: Vec<u8>,
        mime_type: impl Into<String>,
        prompt: Option<String>,
    ) -> Self {
        self.image = Some(ImagePart {
            data,
            mime_type: mime_type.into(),
            prompt,
        });
        self
    }

    pub fn with_audio(mut self, data: Vec<u8>, format: impl Into<String>) -> Self {
        self.audio = Some(AudioPart {
            data,
            format: format.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MultimodalReply {
    pub session_id: String,
    /// Labelled part replies joined by blank lines
    pub content: String,
    /// Highest risk across the parts
    pub risk: RiskAssessment,
    pub escalation: EscalationAction,
    /// Whether any part notified the emergency contact
    pub emergency_flag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    pub parts: Vec<InteractionResponse>,
}

/// Succeeds when at least one part was answered
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MultimodalResponse {
    Success(MultimodalReply),
    Error(InteractionFailure),
}

impl MultimodalResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, MultimodalResponse::Success(_))
    }

    pub fn reply(&self) -> Option<&MultimodalReply> {
        match self {
            MultimodalResponse::Success(reply) => Some(reply),
            MultimodalResponse::Error(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&InteractionFailure> {
        match self {
            MultimodalResponse::Success(_) => None,
            MultimodalResponse::Error(failure) => Some(failure),
        }
    }
}

/// Synthesized speech
#[derive(Debug, Clone)]
pub struct SynthesisReply {
    pub audio: Vec<u8>,
    pub mime_type: String,
    pub provider: String,
}

/// Bookkeeping carried through the stages of one interaction
struct Progress {
    session_id: String,
    modality: Modality,
    stages: Vec<InteractionStage>,
    risk: Option<RiskAssessment>,
    escalation: Option<EscalationAction>,
    notification: Option<NotificationOutcome>,
}

impl Progress {
    fn new(session_id: &str, modality: Modality) -> Self {
        Self {
            session_id: session_id.to_string(),
            modality,
            stages: vec![InteractionStage::Received],
            risk: None,
            escalation: None,
            notification: None,
        }
    }

    fn advance(&mut self, stage: InteractionStage) {
        self.stages.push(stage);
    }

    fn fail(self, error: Error) -> InteractionResponse {
        InteractionResponse::Error(self.failure(error))
    }

    fn failure(mut self, error: Error) -> InteractionFailure {
        self.advance(InteractionStage::Failed);
        tracing::error!(
            session_id = %self.session_id,
            modality = %self.modality,
            kind = error.kind(),
            error = %error,
            "Interaction failed"
        );
        metrics::record_interaction(self.modality, "failed");

        let mut message = user_message(&error);
        if let Some(resources) = self.escalation.as_ref().map(EscalationAction::resources) {
            if !resources.is_empty() {
                message.push_str("\n\n");
                message.push_str(&resource_block(resources));
            }
        }
        if let Some(NotificationOutcome::Failed { guidance, .. }) = &self.notification {
            message.push_str("\n\n");
            message.push_str(guidance);
        }

        InteractionFailure {
            session_id: self.session_id,
            kind: error.kind(),
            message,
            detail: error.to_string(),
            risk: self.risk,
            escalation: self.escalation,
            notification: self.notification,
            stages: self.stages,
            error,
        }
    }
}

fn failure_level(failure: &InteractionFailure) -> RiskLevel {
    failure.risk.as_ref().map_or(RiskLevel::None, |r| r.level)
}

fn user_message(error: &Error) -> String {
    match error {
        Error::MalformedPayload(reason) => format!("Invalid request: {}", reason),
        Error::AllProvidersExhausted {
            capability: Capability::SpeechToText,
            ..
        } => "Sorry, I couldn't understand the audio. Please try again or type your message."
            .to_string(),
        Error::AllProvidersExhausted {
            capability: Capability::Vision,
            ..
        } => "Sorry, I couldn't analyze the image. Please try again.".to_string(),
        Error::AllProvidersExhausted { .. } => {
            "I'm having trouble responding right now. Please try again in a moment.".to_string()
        }
        _ => "Something went wrong while handling your message.".to_string(),
    }
}

/// Runs interactions end to end
pub struct InteractionOrchestrator {
    sessions: Arc<SessionStore>,
    registry: Arc<ProviderRegistry>,
    dispatcher: Arc<Dispatcher>,
    detector: CrisisDetector,
    policy: EscalationPolicy,
    notifier: Arc<dyn EmergencyNotifier>,
    persona: PersonaConfig,
    max_context_turns: usize,
    notification_failure_message: String,
    synthesis_language: String,
}

impl InteractionOrchestrator {
    pub fn new(
        settings: &Settings,
        registry: Arc<ProviderRegistry>,
        sessions: Arc<SessionStore>,
        notifier: Arc<dyn EmergencyNotifier>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            sessions.clone(),
            Duration::from_secs(settings.providers.request_timeout_secs),
        ));
        let detector = CrisisDetector::new(&settings.crisis, dispatcher.clone(), registry.clone());

        Self {
            sessions,
            registry,
            dispatcher,
            detector,
            policy: EscalationPolicy::from_config(&settings.escalation),
            notifier,
            persona: settings.persona.clone(),
            max_context_turns: settings.session.max_context_turns,
            notification_failure_message: settings.escalation.notification_failure_message.clone(),
            synthesis_language: settings.providers.google_tts.language.clone(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn notifier_name(&self) -> &str {
        self.notifier.name()
    }

    /// Handle one interaction end to end
    pub async fn handle(&self, request: InteractionRequest) -> InteractionResponse {
        let InteractionRequest {
            session_id,
            payload,
        } = request;
        let modality = payload.modality();
        let mut progress = Progress::new(&session_id, modality);

        // Rejected input never creates a session
        let validated = validate_session_id(&session_id).and_then(|_| validate_payload(&payload));
        if let Err(error) = validated {
            return progress.fail(error);
        }

        let interaction = Interaction::new(session_id.as_str(), payload);
        let interaction_id = interaction.id();
        self.sessions.append(&session_id, interaction.clone());

        tracing::info!(
            session_id = %session_id,
            interaction_id = %interaction_id,
            modality = %modality,
            "Interaction received"
        );

        let inspection = self.detector.inspect(&interaction).await;
        self.sessions
            .note_risk(&session_id, inspection.assessment.level);
        progress.risk = Some(inspection.assessment.clone());
        progress.advance(InteractionStage::RiskAssessed);

        let action = self.policy.decide(inspection.assessment.level);
        metrics::record_escalation(action.kind());
        progress.escalation = Some(action.clone());
        progress.advance(InteractionStage::EscalationDecided);

        if let EscalationAction::NotifyEmergencyContact { message, .. } = &action {
            progress.notification =
                Some(self.notify(&session_id, &inspection.assessment, message).await);
        }

        let Some(content) = inspection.content else {
            let error = inspection
                .failure
                .unwrap_or_else(|| Error::Internal("interaction produced no content".to_string()));
            return progress.fail(error);
        };

        let user_turn = match interaction.payload() {
            Payload::Image {
                prompt: Some(note), ..
            } => format!("I'm sharing an image. It shows: {}\n{}", content, note),
            Payload::Image { .. } => format!("I'm sharing an image. It shows: {}", content),
            _ => content.clone(),
        };

        let history = self
            .sessions
            .context_messages(&session_id, self.max_context_turns);
        let mut prompt = PromptBuilder::new().with_persona(self.persona.clone());
        match &action {
            EscalationAction::None => {}
            EscalationAction::InjectResources { resources } => {
                prompt = prompt.with_resources(resources);
            }
            EscalationAction::NotifyEmergencyContact { resources, .. } => {
                prompt = prompt.with_crisis_guidance().with_resources(resources);
            }
        }
        let messages = prompt.with_history(&history).user_message(&user_turn).build();

        progress.advance(InteractionStage::DispatchedToAi);
        let result = self
            .dispatcher
            .dispatch(
                Some(&session_id),
                &CapabilityRequest::Chat { messages },
                self.registry.providers(Capability::Chat),
            )
            .await;

        let Some(answer) = result.text().map(str::trim).filter(|t| !t.is_empty()) else {
            let error = if result.success {
                Error::provider(result.provider.as_str(), "empty chat response")
            } else {
                Dispatcher::exhausted(&result)
            };
            return progress.fail(error);
        };

        let mut reply = match &action {
            EscalationAction::NotifyEmergencyContact { resources, message } => format!(
                "{}\n\n{}\n\n{}",
                message,
                answer,
                resource_block(resources)
            ),
            _ => answer.to_string(),
        };
        if let Some(NotificationOutcome::Failed { guidance, .. }) = &progress.notification {
            reply.push_str("\n\n");
            reply.push_str(guidance);
        }

        self.sessions.append_all(
            &session_id,
            [
                SessionEntry::from(ConversationTurn::user(user_turn)),
                SessionEntry::from(ConversationTurn::assistant(reply.clone())),
            ],
        );
        progress.advance(InteractionStage::Responded);

        tracing::info!(
            session_id = %session_id,
            interaction_id = %interaction_id,
            provider = %result.provider,
            risk = %inspection.assessment.level,
            escalation = action.kind().as_str(),
            "Interaction responded"
        );
        metrics::record_interaction(modality, "responded");

        InteractionResponse::Success(InteractionReply {
            session_id,
            interaction_id,
            modality,
            content: reply,
            risk: inspection.assessment,
            escalation: action,
            notification: progress.notification,
            transcript: (modality == Modality::Audio).then_some(content),
            provider: result.provider,
            stages: progress.stages,
        })
    }

    /// Handle image, audio and text submitted together.
    ///
    /// Every part goes through [`handle`](Self::handle) in turn, so each is
    /// recorded, assessed and escalated on its own. When no text is given the
    /// audio transcript stands in for it; the audio part has already answered
    /// it, so no second chat call is made. The combined reply carries the
    /// highest risk of any part.
    pub async fn handle_multimodal(&self, request: MultimodalRequest) -> MultimodalResponse {
        let MultimodalRequest {
            session_id,
            text,
            image,
            audio,
        } = request;
        let text = text.filter(|t| !t.trim().is_empty());

        let mut parts = Vec::with_capacity(3);
        let mut sections = Vec::with_capacity(3);
        let mut transcript = None;

        if let Some(ImagePart {
            data,
            mime_type,
            prompt,
        }) = image
        {
            let response = self
                .handle(InteractionRequest::image(session_id.as_str(), data, mime_type, prompt))
                .await;
            sections.push(format!("Image: {}", response.message()));
            parts.push(response);
        }

        if let Some(AudioPart { data, format }) = audio {
            let response = self
                .handle(InteractionRequest::audio(session_id.as_str(), data, format))
                .await;
            transcript = response.reply().and_then(|r| r.transcript.clone());
            sections.push(format!("Voice: {}", response.message()));
            parts.push(response);
        }

        if let Some(text) = text {
            let response = self
                .handle(InteractionRequest::text(session_id.as_str(), text))
                .await;
            sections.push(format!("Response: {}", response.message()));
            parts.push(response);
        }

        if !parts.iter().any(InteractionResponse::is_success) {
            let failure = parts
                .into_iter()
                .filter_map(InteractionResponse::into_failure)
                .reduce(|best, f| {
                    if failure_level(&f) > failure_level(&best) {
                        f
                    } else {
                        best
                    }
                });
            return MultimodalResponse::Error(failure.unwrap_or_else(|| {
                Progress::new(&session_id, Modality::Text).failure(Error::MalformedPayload(
                    "request has no image, audio or text".to_string(),
                ))
            }));
        }

        let risk = parts
            .iter()
            .filter_map(InteractionResponse::risk)
            .fold(RiskAssessment::none(), |best, r| {
                if r.level > best.level {
                    r.clone()
                } else {
                    best
                }
            });
        let escalation = self.policy.decide(risk.level);
        let emergency_flag = parts.iter().any(|part| {
            let escalation = match part {
                InteractionResponse::Success(reply) => Some(&reply.escalation),
                InteractionResponse::Error(failure) => failure.escalation.as_ref(),
            };
            matches!(escalation, Some(EscalationAction::NotifyEmergencyContact { .. }))
        });

        tracing::info!(
            session_id = %session_id,
            parts = parts.len(),
            risk = %risk.level,
            emergency = emergency_flag,
            "Multimodal interaction responded"
        );

        MultimodalResponse::Success(MultimodalReply {
            session_id,
            content: sections.join("\n\n"),
            risk,
            escalation,
            emergency_flag,
            transcript,
            parts,
        })
    }

    async fn notify(
        &self,
        session_id: &str,
        assessment: &RiskAssessment,
        message: &str,
    ) -> NotificationOutcome {
        let alert = EmergencyAlert {
            session_id: session_id.to_string(),
            level: assessment.level,
            signals: assessment.matched_signals.clone(),
            message: message.to_string(),
        };

        match self.notifier.notify(&alert).await {
            Ok(receipt) => {
                tracing::warn!(
                    session_id = %session_id,
                    level = %assessment.level,
                    notifier = %receipt.notifier,
                    reference = %receipt.reference,
                    simulated = receipt.simulated,
                    "Emergency contact notified"
                );
                NotificationOutcome::Sent { receipt }
            }
            Err(error) => {
                tracing::error!(
                    session_id = %session_id,
                    level = %assessment.level,
                    notifier = self.notifier.name(),
                    error = %error,
                    "EMERGENCY NOTIFICATION FAILED"
                );
                metrics::record_notification_failure();
                NotificationOutcome::Failed {
                    error: error.to_string(),
                    guidance: self.notification_failure_message.clone(),
                }
            }
        }
    }

    /// Convert text to speech.
    ///
    /// Premium requests try every text-to-speech provider in order; others
    /// skip ElevenLabs.
    pub async fn synthesize(
        &self,
        session_id: Option<&str>,
        text: &str,
        premium: bool,
        voice_id: Option<String>,
    ) -> Result<SynthesisReply> {
        if let Some(session_id) = session_id {
            validate_session_id(session_id)?;
        }
        validate_synthesis_text(text)?;

        let providers: Vec<Arc<dyn Provider>> = self
            .registry
            .providers(Capability::TextToSpeech)
            .iter()
            .filter(|p| premium || p.name() != ELEVENLABS)
            .cloned()
            .collect();

        let request = CapabilityRequest::Synthesize {
            text: text.to_string(),
            voice: voice_id,
            language: self.synthesis_language.clone(),
        };
        let result = self
            .dispatcher
            .dispatch(session_id, &request, &providers)
            .await;

        if !result.success {
            return Err(Dispatcher::exhausted(&result));
        }

        match result.content {
            Some(ProviderContent::Audio { data, mime_type }) => Ok(SynthesisReply {
                audio: data,
                mime_type,
                provider: result.provider,
            }),
            _ => Err(Error::Internal(format!(
                "{} returned no audio",
                result.provider
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let exhausted = Error::AllProvidersExhausted {
            capability: Capability::Chat,
            attempts: "openai: HTTP 500".to_string(),
        };
        assert!(user_message(&exhausted).contains("trouble responding"));
        assert!(user_message(&Error::MalformedPayload("message is empty".into()))
            .starts_with("Invalid request"));
    }

    #[test]
    fn test_failure_serializes_with_status() {
        let progress = Progress::new("s1", Modality::Text);
        let response = progress.fail(Error::MalformedPayload("message is empty".into()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "malformed_payload");
        assert_eq!(json["stages"], serde_json::json!(["received", "failed"]));
        assert!(json.get("error").is_none());
    }
}
