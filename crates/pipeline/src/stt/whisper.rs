//! Whisper transcription over the OpenAI-compatible audio API
//!
//! Sends the recorded file as multipart form data to
//! `{endpoint}/audio/transcriptions` and reads the `text` field back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use safespace_core::{Capability, CapabilityRequest, Provider, ProviderContent};

use crate::PipelineError;

/// Whisper client configuration
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Provider name reported in results ("openai", "groq")
    pub name: String,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl WhisperConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            name: "openai".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: "whisper-1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            name: "groq".to_string(),
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: api_key.into(),
            model: "whisper-large-v3".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Whisper speech-to-text client
pub struct WhisperStt {
    config: WhisperConfig,
    client: reqwest::Client,
}

impl WhisperStt {
    pub fn new(config: WhisperConfig) -> Result<Self, PipelineError> {
        if config.api_key.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "API key required for {} transcription",
                config.name
            )));
        }
        let client = crate::http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    fn transcriptions_url(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    /// Transcribe an encoded audio file
    pub async fn transcribe(
        &self,
        audio: &[u8],
        format: &str,
        language: Option<&str>,
    ) -> Result<String, PipelineError> {
        let part = multipart::Part::bytes(audio.to_vec())
            .file_name(format!("audio.{}", format))
            .mime_str(mime_for_format(format))
            .map_err(|e| PipelineError::Api(e.to_string()))?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let response = self
            .client
            .post(self.transcriptions_url())
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(PipelineError::InvalidResponse(
                "Empty transcription (audio unintelligible)".to_string(),
            ));
        }

        tracing::debug!(provider = %self.config.name, chars = text.len(), "Transcription complete");
        Ok(text)
    }
}

#[async_trait]
impl Provider for WhisperStt {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::SpeechToText]
    }

    async fn call(&self, request: &CapabilityRequest) -> safespace_core::Result<ProviderContent> {
        let result = match request {
            CapabilityRequest::Transcribe {
                audio,
                format,
                language,
            } => self.transcribe(audio, format, language.as_deref()).await,
            other => Err(PipelineError::Unsupported(other.capability().to_string())),
        };

        result
            .map(ProviderContent::text)
            .map_err(|e| safespace_core::Error::provider(&self.config.name, e))
    }
}

/// MIME type for an uploaded audio format
fn mime_for_format(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(WhisperConfig::openai("k").model, "whisper-1");
        assert_eq!(WhisperConfig::groq("k").model, "whisper-large-v3");
    }

    #[test]
    fn test_requires_key() {
        assert!(WhisperStt::new(WhisperConfig::openai("")).is_err());
    }

    #[test]
    fn test_mime_for_format() {
        assert_eq!(mime_for_format("WAV"), "audio/wav");
        assert_eq!(mime_for_format("mp3"), "audio/mpeg");
        assert_eq!(mime_for_format("aiff"), "application/octet-stream");
    }
}
