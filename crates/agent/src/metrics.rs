//! Metric recording for dispatch, detection and escalation

use safespace_core::{EscalationKind, Modality, ProviderResult, RiskLevel};

pub(crate) fn record_provider_attempt(result: &ProviderResult) {
    let outcome = if result.success { "success" } else { "failure" };
    metrics::counter!(
        "safespace_provider_attempts_total",
        "provider" => result.provider.clone(),
        "capability" => result.capability.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "safespace_provider_latency_ms",
        "provider" => result.provider.clone(),
        "capability" => result.capability.as_str()
    )
    .record(result.latency_ms as f64);
}

pub(crate) fn record_exhausted(result: &ProviderResult) {
    metrics::counter!(
        "safespace_providers_exhausted_total",
        "capability" => result.capability.as_str()
    )
    .increment(1);
}

pub(crate) fn record_risk(level: RiskLevel) {
    metrics::counter!("safespace_risk_assessments_total", "level" => level.as_str()).increment(1);
}

pub(crate) fn record_escalation(kind: EscalationKind) {
    metrics::counter!("safespace_escalations_total", "kind" => kind.as_str()).increment(1);
}

pub(crate) fn record_notification_failure() {
    metrics::counter!("safespace_escalation_notification_failures_total").increment(1);
}

pub(crate) fn record_interaction(modality: Modality, outcome: &'static str) {
    metrics::counter!(
        "safespace_interactions_total",
        "modality" => modality.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
