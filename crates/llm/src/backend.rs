//! LLM backend implementations
//!
//! Both backends implement `safespace_core::Provider`. They make exactly one
//! HTTP call per request; fallback across vendors is the dispatcher's job.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use safespace_core::{Capability, CapabilityRequest, Message, Provider, ProviderContent};

use crate::LlmError;

// =============================================================================
// OpenAI-compatible backend
// =============================================================================

/// Configuration for OpenAI-compatible backends
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Provider name reported in results ("openai", "groq")
    pub name: String,
    /// API endpoint, e.g. https://api.openai.com/v1
    pub endpoint: String,
    pub api_key: String,
    /// Model for chat; `None` disables the chat capability
    pub chat_model: Option<String>,
    /// Model for image description; `None` disables the vision capability
    pub vision_model: Option<String>,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            chat_model: Some("gpt-4".to_string()),
            vision_model: Some("gpt-4o".to_string()),
            max_tokens: 512,
            temperature: 0.2,
            timeout: Duration::from_secs(30),
        }
    }
}

impl OpenAiCompatibleConfig {
    /// Config for OpenAI
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Config for Groq's OpenAI-compatible endpoint
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            name: "groq".to_string(),
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: api_key.into(),
            chat_model: Some("llama-3.3-70b-versatile".to_string()),
            vision_model: Some("meta-llama/llama-4-scout-17b-16e-instruct".to_string()),
            ..Default::default()
        }
    }
}

/// OpenAI-compatible chat/vision backend
///
/// Works with OpenAI, Groq and any server exposing `/chat/completions`.
pub struct OpenAiCompatibleBackend {
    config: OpenAiCompatibleConfig,
    capabilities: Vec<Capability>,
    client: Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() && !config.endpoint.starts_with("http://localhost") {
            return Err(LlmError::Configuration(format!(
                "API key required for {}",
                config.name
            )));
        }

        let mut capabilities = Vec::new();
        if config.chat_model.is_some() {
            capabilities.push(Capability::Chat);
        }
        if config.vision_model.is_some() {
            capabilities.push(Capability::Vision);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            capabilities,
            client,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    async fn complete(&self, request: &OpenAiChatRequest) -> Result<String, LlmError> {
        tracing::debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion"
        );
        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        if content.is_empty() {
            return Err(LlmError::InvalidResponse("Empty completion".to_string()));
        }
        Ok(content)
    }

    /// Chat completion over a message list
    pub async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let model = self
            .config
            .chat_model
            .clone()
            .ok_or_else(|| LlmError::Unsupported("chat".to_string()))?;

        let request = OpenAiChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.to_string(),
                    content: OpenAiContent::Text(m.content.clone()),
                })
                .collect(),
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            stream: Some(false),
        };

        self.complete(&request).await
    }

    /// Describe an image with a text prompt
    pub async fn describe_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let model = self
            .config
            .vision_model
            .clone()
            .ok_or_else(|| LlmError::Unsupported("vision".to_string()))?;

        let data_url = format!("data:{};base64,{}", mime_type, BASE64.encode(image));
        let request = OpenAiChatRequest {
            model,
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: OpenAiContent::Parts(vec![
                    OpenAiContentPart::Text {
                        text: prompt.to_string(),
                    },
                    OpenAiContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ]),
            }],
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            stream: Some(false),
        };

        self.complete(&request).await
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn call(&self, request: &CapabilityRequest) -> safespace_core::Result<ProviderContent> {
        let result = match request {
            CapabilityRequest::Chat { messages } => self.chat(messages).await,
            CapabilityRequest::Vision {
                image,
                mime_type,
                prompt,
            } => self.describe_image(image, mime_type, prompt).await,
            other => Err(LlmError::Unsupported(other.capability().to_string())),
        };

        result
            .map(ProviderContent::text)
            .map_err(|e| safespace_core::Error::provider(&self.config.name, e))
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: OpenAiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

// =============================================================================
// Ollama backend
// =============================================================================

/// Ollama configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout: Duration,
    /// Keep model loaded between calls ("5m", "1h", "-1")
    pub keep_alive: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "alibayram/medgemma:4b".to_string(),
            max_tokens: 350,
            temperature: 0.7,
            top_p: 0.9,
            timeout: Duration::from_secs(60),
            keep_alive: "5m".to_string(),
        }
    }
}

/// Local Ollama chat backend
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    pub async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = OllamaChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(self.config.temperature),
                top_p: Some(self.config.top_p),
                num_predict: Some(self.config.max_tokens as i32),
            }),
            keep_alive: Some(self.config.keep_alive.clone()),
        };

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            "Sending Ollama chat"
        );
        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            if status.as_u16() == 404 {
                return Err(LlmError::Api(format!("Model not found: {}", self.config.model)));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error)));
        }

        let response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = response.message.content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::InvalidResponse("Empty completion".to_string()));
        }
        Ok(content)
    }
}

#[async_trait]
impl Provider for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Chat]
    }

    async fn call(&self, request: &CapabilityRequest) -> safespace_core::Result<ProviderContent> {
        let result = match request {
            CapabilityRequest::Chat { messages } => self.chat(messages).await,
            other => Err(LlmError::Unsupported(other.capability().to_string())),
        };

        result
            .map(ProviderContent::text)
            .map_err(|e| safespace_core::Error::provider("ollama", e))
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}
