//! Provider registry
//!
//! Maps each capability to its ordered fallback list. Built from settings at
//! startup: a vendor is registered only when its credentials are present.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use safespace_config::providers::{ELEVENLABS, GOOGLE, GROQ, OLLAMA, OPENAI};
use safespace_config::ProvidersConfig;
use safespace_core::{Capability, Error, Provider};
use safespace_llm::{OllamaBackend, OllamaConfig, OpenAiCompatibleBackend, OpenAiCompatibleConfig};
use safespace_pipeline::{
    ElevenLabsConfig, ElevenLabsTts, GoogleTts, GoogleTtsConfig, WhisperConfig, WhisperStt,
};

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<Capability, Vec<Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the end of a capability's fallback list
    pub fn register(&mut self, capability: Capability, provider: Arc<dyn Provider>) {
        self.providers.entry(capability).or_default().push(provider);
    }

    /// Builder form of `register`
    pub fn with(mut self, capability: Capability, provider: Arc<dyn Provider>) -> Self {
        self.register(capability, provider);
        self
    }

    /// Fallback list for a capability, possibly empty
    pub fn providers(&self, capability: Capability) -> &[Arc<dyn Provider>] {
        self.providers
            .get(&capability)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Provider names per capability, in fallback order
    pub fn configured(&self) -> Vec<(Capability, Vec<String>)> {
        Capability::ALL
            .iter()
            .map(|cap| {
                let names = self
                    .providers(*cap)
                    .iter()
                    .map(|p| p.name().to_string())
                    .collect();
                (*cap, names)
            })
            .collect()
    }

    /// Build the registry from provider settings
    pub fn from_settings(config: &ProvidersConfig) -> Result<Self, Error> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let clients = VendorClients::build(config, timeout)?;
        let mut registry = Self::new();

        let order = &config.order;
        let lists = [
            (Capability::Chat, &order.chat),
            (Capability::Vision, &order.vision),
            (Capability::SpeechToText, &order.speech_to_text),
            (Capability::TextToSpeech, &order.text_to_speech),
        ];

        for (capability, names) in lists {
            for name in names {
                match clients.lookup(name, capability) {
                    Some(provider) => {
                        tracing::info!(
                            provider = %name,
                            capability = %capability,
                            "Registered provider"
                        );
                        registry.register(capability, provider);
                    }
                    None => {
                        tracing::warn!(
                            provider = %name,
                            capability = %capability,
                            "Provider not configured, skipping"
                        );
                    }
                }
            }
            if registry.providers(capability).is_empty() {
                tracing::warn!(capability = %capability, "No providers available");
            }
        }

        Ok(registry)
    }
}

/// Vendor clients constructed once and shared across capabilities
#[derive(Default)]
struct VendorClients {
    openai_llm: Option<Arc<dyn Provider>>,
    openai_stt: Option<Arc<dyn Provider>>,
    groq_llm: Option<Arc<dyn Provider>>,
    groq_stt: Option<Arc<dyn Provider>>,
    ollama: Option<Arc<dyn Provider>>,
    elevenlabs: Option<Arc<dyn Provider>>,
    google: Option<Arc<dyn Provider>>,
}

impl VendorClients {
    fn build(config: &ProvidersConfig, timeout: Duration) -> Result<Self, Error> {
        let mut clients = Self::default();

        if let Some(api_key) = config.openai.api_key.clone().filter(|k| !k.is_empty()) {
            let openai = &config.openai;
            clients.openai_llm = Some(Arc::new(OpenAiCompatibleBackend::new(OpenAiCompatibleConfig {
                name: OPENAI.to_string(),
                endpoint: openai.endpoint.clone(),
                api_key: api_key.clone(),
                chat_model: Some(openai.chat_model.clone()),
                vision_model: Some(openai.vision_model.clone()),
                max_tokens: openai.max_tokens,
                temperature: openai.temperature,
                timeout,
            })?));
            clients.openai_stt = Some(Arc::new(WhisperStt::new(WhisperConfig {
                name: OPENAI.to_string(),
                endpoint: openai.endpoint.clone(),
                api_key,
                model: openai.transcription_model.clone(),
                timeout,
            })?));
        }

        if let Some(api_key) = config.groq.api_key.clone().filter(|k| !k.is_empty()) {
            let groq = &config.groq;
            clients.groq_llm = Some(Arc::new(OpenAiCompatibleBackend::new(OpenAiCompatibleConfig {
                name: GROQ.to_string(),
                endpoint: groq.endpoint.clone(),
                api_key: api_key.clone(),
                chat_model: Some(groq.chat_model.clone()),
                vision_model: Some(groq.vision_model.clone()),
                max_tokens: groq.max_tokens,
                temperature: groq.temperature,
                timeout,
            })?));
            clients.groq_stt = Some(Arc::new(WhisperStt::new(WhisperConfig {
                name: GROQ.to_string(),
                endpoint: groq.endpoint.clone(),
                api_key,
                model: groq.transcription_model.clone(),
                timeout,
            })?));
        }

        if config.ollama.enabled {
            let ollama = &config.ollama;
            clients.ollama = Some(Arc::new(OllamaBackend::new(OllamaConfig {
                endpoint: ollama.endpoint.clone(),
                model: ollama.model.clone(),
                max_tokens: ollama.max_tokens,
                temperature: ollama.temperature,
                top_p: ollama.top_p,
                timeout,
                keep_alive: ollama.keep_alive.clone(),
            })?));
        }

        if let Some(api_key) = config.elevenlabs.api_key.clone().filter(|k| !k.is_empty()) {
            let elevenlabs = &config.elevenlabs;
            clients.elevenlabs = Some(Arc::new(ElevenLabsTts::new(ElevenLabsConfig {
                endpoint: elevenlabs.endpoint.clone(),
                api_key,
                voice_id: elevenlabs.voice_id.clone(),
                model_id: elevenlabs.model_id.clone(),
                timeout,
                ..ElevenLabsConfig::default()
            })?));
        }

        if config.google_tts.enabled {
            clients.google = Some(Arc::new(GoogleTts::new(GoogleTtsConfig {
                endpoint: config.google_tts.endpoint.clone(),
                language: config.google_tts.language.clone(),
                timeout,
            })?));
        }

        Ok(clients)
    }

    fn lookup(&self, name: &str, capability: Capability) -> Option<Arc<dyn Provider>> {
        let client = match (name, capability) {
            (OPENAI, Capability::SpeechToText) => &self.openai_stt,
            (OPENAI, _) => &self.openai_llm,
            (GROQ, Capability::SpeechToText) => &self.groq_stt,
            (GROQ, _) => &self.groq_llm,
            (OLLAMA, _) => &self.ollama,
            (ELEVENLABS, _) => &self.elevenlabs,
            (GOOGLE, _) => &self.google,
            _ => return None,
        };
        client.clone().filter(|p| p.supports(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safespace_config::{ElevenLabsSettings, GroqSettings, OpenAiSettings};

    fn keyless() -> ProvidersConfig {
        ProvidersConfig {
            openai: OpenAiSettings {
                api_key: None,
                ..OpenAiSettings::default()
            },
            groq: GroqSettings {
                api_key: None,
                ..GroqSettings::default()
            },
            elevenlabs: ElevenLabsSettings {
                api_key: None,
                ..ElevenLabsSettings::default()
            },
            ..ProvidersConfig::default()
        }
    }

    #[test]
    fn test_keyless_registry_keeps_google_tts_only() {
        let registry = ProviderRegistry::from_settings(&keyless()).unwrap();
        assert!(registry.providers(Capability::Chat).is_empty());
        assert!(registry.providers(Capability::Vision).is_empty());
        let tts: Vec<&str> = registry
            .providers(Capability::TextToSpeech)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(tts, vec!["google"]);
    }

    #[test]
    fn test_order_follows_settings() {
        let mut config = keyless();
        config.openai.api_key = Some("sk-test".to_string());
        config.groq.api_key = Some("gsk-test".to_string());
        config.order.chat = vec!["groq".to_string(), "openai".to_string()];

        let registry = ProviderRegistry::from_settings(&config).unwrap();
        let chat: Vec<&str> = registry
            .providers(Capability::Chat)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(chat, vec!["groq", "openai"]);

        let stt = registry.providers(Capability::SpeechToText);
        assert_eq!(stt.len(), 2);
        assert!(stt.iter().all(|p| p.supports(Capability::SpeechToText)));
    }

    #[test]
    fn test_configured_lists_every_capability() {
        let registry = ProviderRegistry::from_settings(&keyless()).unwrap();
        let configured = registry.configured();
        assert_eq!(configured.len(), 4);
        assert_eq!(configured[3].0, Capability::TextToSpeech);
    }
}
