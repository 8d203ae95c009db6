//! ElevenLabs premium voice synthesis

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use safespace_core::{Capability, CapabilityRequest, Provider, ProviderContent};

use crate::PipelineError;

/// ElevenLabs configuration
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub endpoint: String,
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub timeout: Duration,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.elevenlabs.io".to_string(),
            api_key: String::new(),
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// ElevenLabs text-to-speech client
pub struct ElevenLabsTts {
    config: ElevenLabsConfig,
    client: reqwest::Client,
}

impl ElevenLabsTts {
    pub fn new(config: ElevenLabsConfig) -> Result<Self, PipelineError> {
        if config.api_key.is_empty() {
            return Err(PipelineError::Configuration(
                "ElevenLabs API key required".to_string(),
            ));
        }
        let client = crate::http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    /// Synthesize MP3 audio; `voice_id` overrides the configured voice
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
    ) -> Result<Vec<u8>, PipelineError> {
        let voice_id = voice_id.unwrap_or(&self.config.voice_id);
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.endpoint.trim_end_matches('/'),
            voice_id
        );

        let request = SynthesisRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        };

        tracing::debug!(
            voice_id = %voice_id,
            chars = text.chars().count(),
            "Requesting ElevenLabs speech"
        );
        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api(format!("HTTP {}: {}", status, body)));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(PipelineError::InvalidResponse("Empty audio".to_string()));
        }
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl Provider for ElevenLabsTts {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::TextToSpeech]
    }

    async fn call(&self, request: &CapabilityRequest) -> safespace_core::Result<ProviderContent> {
        let result = match request {
            CapabilityRequest::Synthesize { text, voice, .. } => {
                self.synthesize(text, voice.as_deref()).await
            }
            other => Err(PipelineError::Unsupported(other.capability().to_string())),
        };

        result
            .map(|data| ProviderContent::Audio {
                data,
                mime_type: "audio/mpeg".to_string(),
            })
            .map_err(|e| safespace_core::Error::provider("elevenlabs", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voice() {
        let config = ElevenLabsConfig::default();
        assert_eq!(config.voice_id, "pNInz6obpgDQGcFmaJgB");
        assert_eq!(config.model_id, "eleven_monolingual_v1");
    }

    #[test]
    fn test_requires_key() {
        assert!(ElevenLabsTts::new(ElevenLabsConfig::default()).is_err());
    }

    #[test]
    fn test_request_serialization() {
        let request = SynthesisRequest {
            text: "hello",
            model_id: "eleven_monolingual_v1",
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model_id"], "eleven_monolingual_v1");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
    }
}
