//! Crisis detection
//!
//! Weighted phrase matching over user text. Audio is transcribed and images
//! are described through the fallback dispatcher first, then scanned the same
//! way as text.

use std::sync::Arc;

use safespace_config::{CrisisConfig, RiskThresholds};
use safespace_core::{
    Capability, CapabilityRequest, Error, Interaction, Payload, RiskAssessment, RiskLevel,
};

use crate::dispatcher::Dispatcher;
use crate::metrics;
use crate::registry::ProviderRegistry;

/// Phrase list and thresholds used to score text
#[derive(Debug, Clone)]
pub struct CrisisPolicy {
    /// Normalized phrases with their weights, in policy order
    phrases: Vec<(String, f32)>,
    thresholds: RiskThresholds,
}

impl CrisisPolicy {
    pub fn new(phrases: Vec<(String, f32)>, thresholds: RiskThresholds) -> Self {
        let phrases = phrases
            .into_iter()
            .map(|(phrase, weight)| (normalize(&phrase), weight))
            .filter(|(phrase, _)| !phrase.is_empty())
            .collect();
        Self {
            phrases,
            thresholds,
        }
    }

    pub fn from_config(config: &CrisisConfig) -> Self {
        Self::new(
            config
                .phrases
                .iter()
                .map(|p| (p.phrase.clone(), p.weight))
                .collect(),
            config.thresholds.clone(),
        )
    }

    /// Score a piece of text. Pure; each phrase counts at most once.
    pub fn assess_text(&self, text: &str) -> RiskAssessment {
        let text = normalize(text);
        let mut matched_signals = Vec::new();
        let mut score = 0.0;

        for (phrase, weight) in &self.phrases {
            if text.contains(phrase.as_str()) {
                matched_signals.push(phrase.clone());
                score += weight;
            }
        }

        if matched_signals.is_empty() {
            return RiskAssessment::none();
        }

        RiskAssessment {
            level: self.level_for(score),
            matched_signals,
            score,
        }
    }

    fn level_for(&self, score: f32) -> RiskLevel {
        let t = &self.thresholds;
        if score >= t.critical {
            RiskLevel::Critical
        } else if score >= t.high {
            RiskLevel::High
        } else if score >= t.moderate {
            RiskLevel::Moderate
        } else if score >= t.low {
            RiskLevel::Low
        } else {
            RiskLevel::None
        }
    }
}

/// Lowercase, fold typographic apostrophes and collapse whitespace runs
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .map(|c| match c {
                    '\u{2019}' | '\u{2018}' => '\'',
                    other => other,
                })
                .collect::<String>()
                .to_lowercase()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of inspecting one interaction
#[derive(Debug, Clone)]
pub struct Inspection {
    pub assessment: RiskAssessment,
    /// Text derived from the interaction: the message, transcript or image description
    pub content: Option<String>,
    /// Set when transcription or image analysis was exhausted
    pub failure: Option<Error>,
}

pub struct CrisisDetector {
    policy: CrisisPolicy,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<ProviderRegistry>,
    image_prompt: String,
    transcription_language: Option<String>,
}

impl CrisisDetector {
    pub fn new(
        config: &CrisisConfig,
        dispatcher: Arc<Dispatcher>,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            policy: CrisisPolicy::from_config(config),
            dispatcher,
            registry,
            image_prompt: config.image_prompt.clone(),
            transcription_language: config.transcription_language.clone(),
        }
    }

    pub fn policy(&self) -> &CrisisPolicy {
        &self.policy
    }

    /// Assess an interaction, discarding the derived content
    pub async fn assess(&self, interaction: &Interaction) -> RiskAssessment {
        self.inspect(interaction).await.assessment
    }

    /// Assess an interaction and keep the text it was derived from
    pub async fn inspect(&self, interaction: &Interaction) -> Inspection {
        let session_id = interaction.session_id();

        let inspection = match interaction.payload() {
            Payload::Text { message } => Inspection {
                assessment: self.policy.assess_text(message),
                content: Some(message.clone()),
                failure: None,
            },
            Payload::Audio { data, format } => {
                let request = CapabilityRequest::Transcribe {
                    audio: data.clone(),
                    format: format.clone(),
                    language: self.transcription_language.clone(),
                };
                self.inspect_transcript(session_id, &request).await
            }
            Payload::Image {
                data,
                mime_type,
                prompt,
            } => {
                let request = CapabilityRequest::Vision {
                    image: data.clone(),
                    mime_type: mime_type.clone(),
                    prompt: self.image_prompt.clone(),
                };
                self.inspect_image(session_id, &request, prompt.as_deref())
                    .await
            }
        };

        tracing::info!(
            session_id = %session_id,
            modality = %interaction.modality(),
            level = %inspection.assessment.level,
            score = inspection.assessment.score,
            signals = inspection.assessment.matched_signals.len(),
            "Risk assessed"
        );
        metrics::record_risk(inspection.assessment.level);

        inspection
    }

    async fn inspect_transcript(
        &self,
        session_id: &str,
        request: &CapabilityRequest,
    ) -> Inspection {
        let providers = self.registry.providers(Capability::SpeechToText);
        let result = self
            .dispatcher
            .dispatch(Some(session_id), request, providers)
            .await;

        match result.text().map(str::trim).filter(|t| !t.is_empty()) {
            Some(transcript) => Inspection {
                assessment: self.policy.assess_text(transcript),
                content: Some(transcript.to_string()),
                failure: None,
            },
            None => {
                let failure = if result.success {
                    Error::AllProvidersExhausted {
                        capability: Capability::SpeechToText,
                        attempts: format!("{}: empty transcription", result.provider),
                    }
                } else {
                    Dispatcher::exhausted(&result)
                };
                tracing::warn!(
                    session_id = %session_id,
                    error = %failure,
                    "Transcription failed, risk cannot be assessed from audio"
                );
                Inspection {
                    assessment: RiskAssessment {
                        level: RiskLevel::None,
                        matched_signals: vec![format!("transcription_failed: {}", failure)],
                        score: 0.0,
                    },
                    content: None,
                    failure: Some(failure),
                }
            }
        }
    }

    async fn inspect_image(
        &self,
        session_id: &str,
        request: &CapabilityRequest,
        user_prompt: Option<&str>,
    ) -> Inspection {
        let providers = self.registry.providers(Capability::Vision);
        let result = self
            .dispatcher
            .dispatch(Some(session_id), request, providers)
            .await;

        match result.text().map(str::trim).filter(|t| !t.is_empty()) {
            Some(description) => {
                let scanned = match user_prompt {
                    Some(note) => format!("{}\n{}", description, note),
                    None => description.to_string(),
                };
                Inspection {
                    assessment: self.policy.assess_text(&scanned),
                    content: Some(description.to_string()),
                    failure: None,
                }
            }
            None => {
                let failure = if result.success {
                    Error::AllProvidersExhausted {
                        capability: Capability::Vision,
                        attempts: format!("{}: empty description", result.provider),
                    }
                } else {
                    Dispatcher::exhausted(&result)
                };
                tracing::warn!(
                    session_id = %session_id,
                    error = %failure,
                    "Image analysis failed, assuming moderate risk"
                );
                // The user's own note is still scanned; the floor only raises the level.
                let mut assessment = user_prompt
                    .map(|note| self.policy.assess_text(note))
                    .unwrap_or_default()
                    .at_least(RiskLevel::Moderate);
                assessment
                    .matched_signals
                    .push(format!("image_analysis_failed: {}", failure));
                Inspection {
                    assessment,
                    content: None,
                    failure: Some(failure),
                }
            }
        }
    }
}
