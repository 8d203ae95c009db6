//! Emergency notification collaborators
//!
//! - `TwilioNotifier`: places a voice call (or sends an SMS) to the emergency contact
//! - `SimulatedNotifier`: logs and records alerts, for development
//! - `UnconfiguredNotifier`: fails every alert so a missing setup is never silent

pub mod notifier;

pub use notifier::{build_notifier, SimulatedNotifier, TwilioNotifier, UnconfiguredNotifier};

use thiserror::Error;

/// Notification errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Twilio API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Network(err.to_string())
    }
}

impl From<ToolError> for safespace_core::Error {
    fn from(err: ToolError) -> Self {
        safespace_core::Error::EscalationNotificationFailed(err.to_string())
    }
}
