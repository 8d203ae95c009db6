//! Speech provider clients
//!
//! - `WhisperStt`: OpenAI-compatible `/audio/transcriptions` (OpenAI, Groq)
//! - `ElevenLabsTts`: premium voice synthesis
//! - `GoogleTts`: keyless Google Translate synthesis, the last-resort voice

pub mod stt;
pub mod tts;

pub use stt::{WhisperConfig, WhisperStt};
pub use tts::{chunk_text, ElevenLabsConfig, ElevenLabsTts, GoogleTts, GoogleTtsConfig};

use thiserror::Error;

/// Speech pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
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

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::Timeout
        } else {
            PipelineError::Network(err.to_string())
        }
    }
}

impl From<PipelineError> for safespace_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Configuration(message) => safespace_core::Error::Configuration(message),
            other => safespace_core::Error::Internal(other.to_string()),
        }
    }
}

/// Build an HTTP client with the given timeout
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Configuration(format!("Failed to create HTTP client: {}", e)))
}
