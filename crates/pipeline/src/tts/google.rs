//! Google Translate speech synthesis
//!
//! The endpoint accepts short inputs only, so text is split into chunks and
//! the MP3 segments are concatenated in order.

use std::time::Duration;

use async_trait::async_trait;

use safespace_core::{Capability, CapabilityRequest, Provider, ProviderContent};

use crate::PipelineError;

/// Longest text the translate endpoint accepts per request
const MAX_CHUNK_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct GoogleTtsConfig {
    pub endpoint: String,
    pub language: String,
    pub timeout: Duration,
}

impl Default for GoogleTtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://translate.google.com".to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Google Translate text-to-speech client
pub struct GoogleTts {
    config: GoogleTtsConfig,
    client: reqwest::Client,
}

impl GoogleTts {
    pub fn new(config: GoogleTtsConfig) -> Result<Self, PipelineError> {
        let client = crate::http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub async fn synthesize(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<Vec<u8>, PipelineError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(PipelineError::Unsupported("empty text".to_string()));
        }

        let language = language.unwrap_or(&self.config.language);
        let url = format!("{}/translate_tts", self.config.endpoint.trim_end_matches('/'));
        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(PipelineError::Api(format!(
                    "HTTP {} for chunk {}/{}",
                    status, idx, total
                )));
            }
            audio.extend_from_slice(&response.bytes().await?);
        }
        tracing::debug!(chunks = chunks.len(), bytes = audio.len(), "Fetched Google TTS audio");

        if audio.is_empty() {
            return Err(PipelineError::InvalidResponse("Empty audio".to_string()));
        }
        Ok(audio)
    }
}

#[async_trait]
impl Provider for GoogleTts {
    fn name(&self) -> &str {
        "google"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::TextToSpeech]
    }

    async fn call(&self, request: &CapabilityRequest) -> safespace_core::Result<ProviderContent> {
        let result = match request {
            CapabilityRequest::Synthesize { text, language, .. } => {
                self.synthesize(text, Some(language.as_str())).await
            }
            other => Err(PipelineError::Unsupported(other.capability().to_string())),
        };

        result
            .map(|data| ProviderContent::Audio {
                data,
                mime_type: "audio/mpeg".to_string(),
            })
            .map_err(|e| safespace_core::Error::provider("google", e))
    }
}

/// Split text into chunks of at most `max_chars` characters at whitespace.
/// Words longer than `max_chars` are split hard.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word;

        while word.chars().count() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let split = word
                .char_indices()
                .nth(max_chars)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            chunks.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }

        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("  You are not alone. ", 100), vec!["You are not alone."]);
    }

    #[test]
    fn test_chunks_respect_limit() {
        let text = "word ".repeat(60);
        let chunks = chunk_text(&text, 100);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert_eq!(chunks.join(" "), text.trim());
    }

    #[test]
    fn test_long_word_is_split() {
        let word = "a".repeat(250);
        let chunks = chunk_text(&word, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(chunk_text("   ", 100).is_empty());
    }
}
