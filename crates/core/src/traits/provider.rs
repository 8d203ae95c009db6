//! Generic capability-call interface

use crate::{Capability, CapabilityRequest, ProviderContent, Result};
use async_trait::async_trait;

/// A third-party AI service offering one or more capabilities
///
/// Implementations:
/// - `OpenAiCompatibleBackend` - OpenAI and Groq chat/vision
/// - `OllamaBackend` - local chat model
/// - `WhisperStt` - OpenAI and Groq transcription
/// - `ElevenLabsTts`, `GoogleTts` - speech synthesis
///
/// Failures are reported as `Error::ProviderUnavailable`; the dispatcher
/// treats any error as terminal for that attempt and moves on.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Provider name used in logs, metrics and provider results
    fn name(&self) -> &str;

    /// Capabilities this provider can serve
    fn capabilities(&self) -> &[Capability];

    /// Check whether a capability is served
    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Perform one capability call
    async fn call(&self, request: &CapabilityRequest) -> Result<ProviderContent>;
}
