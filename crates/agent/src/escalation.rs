//! Escalation policy
//!
//! A fixed lookup from risk level to escalation action. Sending the emergency
//! notification is left to the orchestrator.

use safespace_config::EscalationConfig;
use safespace_core::{CrisisResource, EscalationAction, RiskLevel};

#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    resources: Vec<CrisisResource>,
    immediate_message: String,
}

impl EscalationPolicy {
    pub fn new(resources: Vec<CrisisResource>, immediate_message: impl Into<String>) -> Self {
        Self {
            resources,
            immediate_message: immediate_message.into(),
        }
    }

    pub fn from_config(config: &EscalationConfig) -> Self {
        Self::new(config.resources.clone(), config.immediate_message.clone())
    }

    /// Map a risk level to its action.
    ///
    /// `none`/`low` yield no action, `moderate` injects crisis resources and
    /// `high`/`critical` notify the emergency contact.
    pub fn decide(&self, level: RiskLevel) -> EscalationAction {
        match level {
            RiskLevel::None | RiskLevel::Low => EscalationAction::None,
            RiskLevel::Moderate => EscalationAction::InjectResources {
                resources: self.resources.clone(),
            },
            RiskLevel::High | RiskLevel::Critical => EscalationAction::NotifyEmergencyContact {
                resources: self.resources.clone(),
                message: self.immediate_message.clone(),
            },
        }
    }

    pub fn resources(&self) -> &[CrisisResource] {
        &self.resources
    }

    pub fn immediate_message(&self) -> &str {
        &self.immediate_message
    }
}

/// Render crisis resources as a bulleted block for prompts and replies
pub fn resource_block(resources: &[CrisisResource]) -> String {
    let mut block = String::from("Crisis support resources:");
    for resource in resources {
        block.push_str("\n- ");
        block.push_str(&resource.to_string());
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use safespace_core::EscalationKind;

    fn policy() -> EscalationPolicy {
        EscalationPolicy::from_config(&EscalationConfig::default())
    }

    #[test]
    fn test_lookup_table() {
        let policy = policy();
        let kinds: Vec<EscalationKind> = [
            RiskLevel::None,
            RiskLevel::Low,
            RiskLevel::Moderate,
            RiskLevel::High,
            RiskLevel::Critical,
        ]
        .into_iter()
        .map(|level| policy.decide(level).kind())
        .collect();

        assert_eq!(
            kinds,
            vec![
                EscalationKind::None,
                EscalationKind::None,
                EscalationKind::InjectResources,
                EscalationKind::NotifyEmergencyContact,
                EscalationKind::NotifyEmergencyContact,
            ]
        );
    }

    #[test]
    fn test_critical_carries_message_and_resources() {
        let policy = policy();
        match policy.decide(RiskLevel::Critical) {
            EscalationAction::NotifyEmergencyContact { resources, message } => {
                assert!(!resources.is_empty());
                assert!(message.contains("Your safety"));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_decide_is_idempotent() {
        let policy = policy();
        assert_eq!(
            policy.decide(RiskLevel::Moderate),
            policy.decide(RiskLevel::Moderate)
        );
    }

    #[test]
    fn test_resource_block() {
        let resources = vec![CrisisResource {
            name: "988 Suicide & Crisis Lifeline".to_string(),
            region: "US".to_string(),
            contact: "Call or text 988".to_string(),
            text_line: None,
        }];
        let block = resource_block(&resources);
        assert_eq!(
            block,
            "Crisis support resources:\n- 988 Suicide & Crisis Lifeline (US): Call or text 988"
        );
    }
}
