//! Chat and vision provider clients
//!
//! Features:
//! - OpenAI-compatible backend (OpenAI, Groq) for chat and image description
//! - Ollama backend for a local therapist model
//! - Prompt building with the therapist persona and crisis resources

pub mod backend;
pub mod prompt;

pub use backend::{OllamaBackend, OllamaConfig, OpenAiCompatibleBackend, OpenAiCompatibleConfig};
pub use prompt::PromptBuilder;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Unsupported request: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for safespace_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(message) => safespace_core::Error::Configuration(message),
            other => safespace_core::Error::Internal(other.to_string()),
        }
    }
}
