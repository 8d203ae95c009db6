//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;

use safespace_agent::{InteractionOrchestrator, ProviderRegistry, SessionStore};
use safespace_config::Settings;
use safespace_core::EmergencyNotifier;
use safespace_tools::build_notifier;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub orchestrator: Arc<InteractionOrchestrator>,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    /// Assemble state from already-built collaborators
    pub fn new(
        settings: Settings,
        registry: ProviderRegistry,
        notifier: Arc<dyn EmergencyNotifier>,
    ) -> Self {
        let orchestrator = InteractionOrchestrator::new(
            &settings,
            Arc::new(registry),
            Arc::new(SessionStore::new()),
            notifier,
        );
        Self {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
            metrics: None,
            started_at: Instant::now(),
        }
    }

    /// Build providers and the emergency notifier from settings
    pub fn from_settings(settings: Settings) -> Result<Self, safespace_core::Error> {
        let registry = ProviderRegistry::from_settings(&settings.providers)?;
        let notifier = build_notifier(&settings.escalation);
        tracing::info!(notifier = notifier.name(), "Emergency notifier ready");
        Ok(Self::new(settings, registry, notifier))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        self.orchestrator.sessions()
    }
}
