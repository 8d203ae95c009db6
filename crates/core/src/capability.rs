//! Capabilities, capability requests and per-attempt provider results

use crate::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An abstract task satisfied by one or more interchangeable providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Chat,
    Vision,
    SpeechToText,
    TextToSpeech,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Chat,
        Capability::Vision,
        Capability::SpeechToText,
        Capability::TextToSpeech,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Chat => "chat",
            Capability::Vision => "vision",
            Capability::SpeechToText => "speech_to_text",
            Capability::TextToSpeech => "text_to_speech",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for one capability, handed unchanged to each provider in turn
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityRequest {
    Chat {
        messages: Vec<Message>,
    },
    Vision {
        image: Vec<u8>,
        mime_type: String,
        prompt: String,
    },
    Transcribe {
        audio: Vec<u8>,
        format: String,
        language: Option<String>,
    },
    Synthesize {
        text: String,
        voice: Option<String>,
        language: String,
    },
}

impl CapabilityRequest {
    /// The capability this request asks for
    pub fn capability(&self) -> Capability {
        match self {
            CapabilityRequest::Chat { .. } => Capability::Chat,
            CapabilityRequest::Vision { .. } => Capability::Vision,
            CapabilityRequest::Transcribe { .. } => Capability::SpeechToText,
            CapabilityRequest::Synthesize { .. } => Capability::TextToSpeech,
        }
    }
}

/// Content returned by a successful provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderContent {
    Text {
        text: String,
    },
    Audio {
        #[serde(with = "crate::encoding::base64_bytes")]
        data: Vec<u8>,
        mime_type: String,
    },
}

impl ProviderContent {
    pub fn text(text: impl Into<String>) -> Self {
        ProviderContent::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ProviderContent::Text { text } => Some(text),
            ProviderContent::Audio { .. } => None,
        }
    }
}

/// Outcome of one dispatch attempt (or of a whole dispatch, when aggregated)
///
/// Built only through `succeeded`/`failed`, so exactly one of `content` and
/// `error` is set and `success` agrees with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResult {
    pub provider: String,
    pub capability: Capability,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ProviderContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ProviderResult {
    pub fn succeeded(
        provider: impl Into<String>,
        capability: Capability,
        content: ProviderContent,
        latency_ms: u64,
    ) -> Self {
        Self {
            provider: provider.into(),
            capability,
            success: true,
            content: Some(content),
            error: None,
            latency_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        provider: impl Into<String>,
        capability: Capability,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            provider: provider.into(),
            capability,
            success: false,
            content: None,
            error: Some(error.into()),
            latency_ms,
            timestamp: Utc::now(),
        }
    }

    /// Text content, if the call succeeded with text
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(ProviderContent::as_text)
    }
}
