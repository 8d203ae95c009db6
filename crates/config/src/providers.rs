//! Provider credentials, models and fallback order

use crate::{default_true, env_var, ConfigError};
use serde::{Deserialize, Serialize};

pub const OPENAI: &str = "openai";
pub const GROQ: &str = "groq";
pub const OLLAMA: &str = "ollama";
pub const ELEVENLABS: &str = "elevenlabs";
pub const GOOGLE: &str = "google";

/// All provider clients configured for the process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Per-attempt timeout applied by the dispatcher
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub openai: OpenAiSettings,

    #[serde(default)]
    pub groq: GroqSettings,

    #[serde(default)]
    pub ollama: OllamaSettings,

    #[serde(default)]
    pub elevenlabs: ElevenLabsSettings,

    #[serde(default)]
    pub google_tts: GoogleTtsSettings,

    #[serde(default)]
    pub order: ProviderOrder,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            openai: OpenAiSettings::default(),
            groq: GroqSettings::default(),
            ollama: OllamaSettings::default(),
            elevenlabs: ElevenLabsSettings::default(),
            google_tts: GoogleTtsSettings::default(),
            order: ProviderOrder::default(),
        }
    }
}

/// OpenAI chat, vision and transcription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    #[serde(default = "default_openai_key")]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_openai_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_openai_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_openai_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_openai_key() -> Option<String> {
    env_var("OPENAI_API_KEY")
}
fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_openai_chat_model() -> String {
    "gpt-4".to_string()
}
fn default_openai_vision_model() -> String {
    "gpt-4o".to_string()
}
fn default_openai_transcription_model() -> String {
    "whisper-1".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> usize {
    512
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: default_openai_key(),
            endpoint: default_openai_endpoint(),
            chat_model: default_openai_chat_model(),
            vision_model: default_openai_vision_model(),
            transcription_model: default_openai_transcription_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Groq chat, vision and transcription (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqSettings {
    #[serde(default = "default_groq_key")]
    pub api_key: Option<String>,
    #[serde(default = "default_groq_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_groq_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_groq_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_groq_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_groq_key() -> Option<String> {
    env_var("GROQ_API_KEY")
}
fn default_groq_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_groq_chat_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_groq_vision_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}
fn default_groq_transcription_model() -> String {
    "whisper-large-v3".to_string()
}

impl Default for GroqSettings {
    fn default() -> Self {
        Self {
            api_key: default_groq_key(),
            endpoint: default_groq_endpoint(),
            chat_model: default_groq_chat_model(),
            vision_model: default_groq_vision_model(),
            transcription_model: default_groq_transcription_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

pub(crate) fn has_key(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.is_empty())
}

impl OpenAiSettings {
    pub fn is_configured(&self) -> bool {
        has_key(&self.api_key)
    }
}

impl GroqSettings {
    pub fn is_configured(&self) -> bool {
        has_key(&self.api_key)
    }
}

/// Local Ollama chat model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_num_predict")]
    pub max_tokens: usize,
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_ollama_model() -> String {
    "alibayram/medgemma:4b".to_string()
}
fn default_ollama_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_num_predict() -> usize {
    350
}
fn default_keep_alive() -> String {
    "5m".to_string()
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_ollama_endpoint(),
            model: default_ollama_model(),
            temperature: default_ollama_temperature(),
            top_p: default_top_p(),
            max_tokens: default_num_predict(),
            keep_alive: default_keep_alive(),
        }
    }
}

/// ElevenLabs premium speech synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsSettings {
    #[serde(default = "default_elevenlabs_key")]
    pub api_key: Option<String>,
    #[serde(default = "default_elevenlabs_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,
}

fn default_elevenlabs_key() -> Option<String> {
    env_var("ELEVENLABS_API_KEY")
}
fn default_elevenlabs_endpoint() -> String {
    "https://api.elevenlabs.io".to_string()
}
fn default_voice_id() -> String {
    "pNInz6obpgDQGcFmaJgB".to_string()
}
fn default_elevenlabs_model() -> String {
    "eleven_monolingual_v1".to_string()
}

impl Default for ElevenLabsSettings {
    fn default() -> Self {
        Self {
            api_key: default_elevenlabs_key(),
            endpoint: default_elevenlabs_endpoint(),
            voice_id: default_voice_id(),
            model_id: default_elevenlabs_model(),
        }
    }
}

impl ElevenLabsSettings {
    pub fn is_configured(&self) -> bool {
        has_key(&self.api_key)
    }
}

/// Google Translate speech synthesis, the keyless fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleTtsSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_google_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_google_endpoint() -> String {
    "https://translate.google.com".to_string()
}
fn default_language() -> String {
    "en".to_string()
}

impl Default for GoogleTtsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_google_endpoint(),
            language: default_language(),
        }
    }
}

/// Fallback order per capability, by provider name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOrder {
    #[serde(default = "default_chat_order")]
    pub chat: Vec<String>,
    #[serde(default = "default_vision_order")]
    pub vision: Vec<String>,
    #[serde(default = "default_stt_order")]
    pub speech_to_text: Vec<String>,
    #[serde(default = "default_tts_order")]
    pub text_to_speech: Vec<String>,
}

fn default_chat_order() -> Vec<String> {
    vec![OPENAI.to_string(), GROQ.to_string(), OLLAMA.to_string()]
}
fn default_vision_order() -> Vec<String> {
    vec![OPENAI.to_string(), GROQ.to_string()]
}
fn default_stt_order() -> Vec<String> {
    vec![OPENAI.to_string(), GROQ.to_string()]
}
fn default_tts_order() -> Vec<String> {
    vec![ELEVENLABS.to_string(), GOOGLE.to_string()]
}

impl Default for ProviderOrder {
    fn default() -> Self {
        Self {
            chat: default_chat_order(),
            vision: default_vision_order(),
            speech_to_text: default_stt_order(),
            text_to_speech: default_tts_order(),
        }
    }
}

impl ProviderOrder {
    /// Reject names that cannot serve the capability they are listed under
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_order("providers.order.chat", &self.chat, &[OPENAI, GROQ, OLLAMA])?;
        check_order("providers.order.vision", &self.vision, &[OPENAI, GROQ])?;
        check_order("providers.order.speech_to_text", &self.speech_to_text, &[OPENAI, GROQ])?;
        check_order("providers.order.text_to_speech", &self.text_to_speech, &[ELEVENLABS, GOOGLE])?;
        Ok(())
    }
}

fn check_order(field: &str, order: &[String], allowed: &[&str]) -> Result<(), ConfigError> {
    for (i, name) in order.iter().enumerate() {
        if !allowed.contains(&name.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("Unknown provider '{}', expected one of {:?}", name, allowed),
            });
        }
        if order[..i].contains(name) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("Provider '{}' listed twice", name),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let order = ProviderOrder::default();
        assert_eq!(order.chat, vec!["openai", "groq", "ollama"]);
        assert_eq!(order.vision, vec!["openai", "groq"]);
        assert_eq!(order.text_to_speech, vec!["elevenlabs", "google"]);
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_order_rejects_unknown_provider() {
        let mut order = ProviderOrder::default();
        order.vision.push("ollama".to_string());
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_order_rejects_duplicates() {
        let mut order = ProviderOrder::default();
        order.chat = vec!["groq".to_string(), "groq".to_string()];
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_groq_defaults() {
        let groq = GroqSettings::default();
        assert_eq!(groq.endpoint, "https://api.groq.com/openai/v1");
        assert_eq!(groq.transcription_model, "whisper-large-v3");
    }

    #[test]
    fn test_partial_table_keeps_vendor_defaults() {
        let config: ProvidersConfig =
            serde_json::from_str(r#"{"groq":{"api_key":"gsk-test"}}"#).unwrap();
        assert!(config.groq.is_configured());
        assert_eq!(config.groq.endpoint, "https://api.groq.com/openai/v1");
        assert_eq!(config.openai.chat_model, "gpt-4");
        assert_eq!(config.request_timeout_secs, 30);
    }
}
