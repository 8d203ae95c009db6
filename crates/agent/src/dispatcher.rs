//! Fallback dispatcher
//!
//! Walks an ordered provider list for one capability request. Providers are
//! called one at a time, each under a bounded timeout, until one succeeds.
//! A failed provider is never retried within the same dispatch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use safespace_core::{CapabilityRequest, Error, Provider, ProviderContent, ProviderResult};

use crate::metrics;
use crate::session::SessionStore;

/// Name reported on the aggregated result when every provider failed
pub const FALLBACK_PROVIDER: &str = "fallback";

pub struct Dispatcher {
    sessions: Arc<SessionStore>,
    attempt_timeout: Duration,
}

impl Dispatcher {
    pub fn new(sessions: Arc<SessionStore>, attempt_timeout: Duration) -> Self {
        Self {
            sessions,
            attempt_timeout,
        }
    }

    /// Try `providers` in order and return the first success.
    ///
    /// Every attempt is appended to the session's provider results when a
    /// session id is given and that session already exists; dispatch never
    /// creates a session. If all providers fail (or the list is empty) the
    /// returned result has `success == false` and an error naming every
    /// attempt as `"<provider>: <error>"`, joined with `"; "`.
    pub async fn dispatch(
        &self,
        session_id: Option<&str>,
        request: &CapabilityRequest,
        providers: &[Arc<dyn Provider>],
    ) -> ProviderResult {
        let capability = request.capability();
        let started = Instant::now();
        let mut failures = Vec::with_capacity(providers.len());

        for provider in providers {
            let name = provider.name().to_string();
            let attempt_start = Instant::now();

            let outcome = self.attempt(provider.as_ref(), request).await;
            let latency_ms = attempt_start.elapsed().as_millis() as u64;

            let result = match outcome {
                Ok(content) => {
                    tracing::debug!(
                        session_id = session_id.unwrap_or("-"),
                        provider = %name,
                        capability = %capability,
                        latency_ms,
                        "Provider call succeeded"
                    );
                    ProviderResult::succeeded(name, capability, content, latency_ms)
                }
                Err(error) => {
                    tracing::warn!(
                        session_id = session_id.unwrap_or("-"),
                        provider = %name,
                        capability = %capability,
                        latency_ms,
                        error = %error,
                        "Provider call failed, falling back"
                    );
                    failures.push(format!("{}: {}", name, error));
                    ProviderResult::failed(name, capability, error, latency_ms)
                }
            };

            metrics::record_provider_attempt(&result);
            if let Some(session_id) = session_id {
                self.sessions.append_existing(session_id, result.clone());
            }

            if result.success {
                return result;
            }
        }

        let error = if failures.is_empty() {
            format!("no providers configured for {}", capability)
        } else {
            failures.join("; ")
        };
        tracing::error!(
            session_id = session_id.unwrap_or("-"),
            capability = %capability,
            attempts = providers.len(),
            error = %error,
            "All providers exhausted"
        );

        let result = ProviderResult::failed(
            FALLBACK_PROVIDER,
            capability,
            error,
            started.elapsed().as_millis() as u64,
        );
        metrics::record_exhausted(&result);
        result
    }

    async fn attempt(
        &self,
        provider: &dyn Provider,
        request: &CapabilityRequest,
    ) -> Result<ProviderContent, String> {
        let capability = request.capability();
        if !provider.supports(capability) {
            return Err(format!("does not support {}", capability));
        }

        match tokio::time::timeout(self.attempt_timeout, provider.call(request)).await {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(Error::ProviderUnavailable { message, .. })) => Err(message),
            Ok(Err(other)) => Err(other.to_string()),
            Err(_) => Err(format!(
                "timed out after {} ms",
                self.attempt_timeout.as_millis()
            )),
        }
    }

    /// Convert a failed dispatch result into `AllProvidersExhausted`
    pub fn exhausted(result: &ProviderResult) -> Error {
        Error::AllProvidersExhausted {
            capability: result.capability,
            attempts: result.error.clone().unwrap_or_default(),
        }
    }
}
