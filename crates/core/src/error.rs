//! Error types shared across the workspace

use crate::Capability;
use thiserror::Error;

/// Errors surfaced by providers, detection, escalation and orchestration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A single provider call failed. Recovered locally by fallback.
    #[error("Provider {provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// Every provider in the ordered list failed for a capability.
    #[error("All providers exhausted for {capability}: {attempts}")]
    AllProvidersExhausted {
        capability: Capability,
        attempts: String,
    },

    /// Input failed validation before any dispatch.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The emergency-contact call itself failed.
    #[error("Emergency notification failed: {0}")]
    EscalationNotificationFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a `ProviderUnavailable` error
    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        Error::ProviderUnavailable {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Stable machine-readable name, used in error responses and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ProviderUnavailable { .. } => "provider_unavailable",
            Error::AllProvidersExhausted { .. } => "all_providers_exhausted",
            Error::MalformedPayload(_) => "malformed_payload",
            Error::EscalationNotificationFailed(_) => "escalation_notification_failed",
            Error::Configuration(_) => "configuration",
            Error::Internal(_) => "internal",
        }
    }
}

/// Result alias using the shared error type
pub type Result<T> = std::result::Result<T, Error>;
