//! Configuration management for SafeSpace
//!
//! Settings are layered from:
//! - `config/default.{toml,yaml,json}`
//! - `config/{env}.{toml,yaml,json}`
//! - `SAFESPACE__SECTION__KEY` environment variables
//!
//! Vendor credentials fall back to their conventional variables
//! (`OPENAI_API_KEY`, `GROQ_API_KEY`, `ELEVENLABS_API_KEY`, `TWILIO_*`).

pub mod crisis;
pub mod providers;
pub mod settings;

pub use crisis::{
    CrisisConfig, EscalationConfig, NotificationMode, RiskThresholds, TwilioConfig, WeightedPhrase,
};
pub use providers::{
    ElevenLabsSettings, GoogleTtsSettings, GroqSettings, OllamaSettings, OpenAiSettings,
    ProviderOrder, ProvidersConfig,
};
pub use settings::{
    load_settings, ObservabilityConfig, PersonaConfig, RuntimeEnvironment, ServerConfig,
    SessionConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for safespace_core::Error {
    fn from(err: ConfigError) -> Self {
        safespace_core::Error::Configuration(err.to_string())
    }
}

/// Read a non-empty environment variable
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn default_true() -> bool {
    true
}
