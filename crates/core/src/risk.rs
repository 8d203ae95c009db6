//! Risk assessments and escalation actions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete severity of crisis indicators, ordered from none to critical
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the crisis detector for one interaction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Matched phrases or detection notes, in detection order
    pub matched_signals: Vec<String>,
    pub score: f32,
}

impl RiskAssessment {
    pub fn none() -> Self {
        Self::default()
    }

    /// Raise the level to at least `floor`, keeping signals and score
    pub fn at_least(mut self, floor: RiskLevel) -> Self {
        self.level = self.level.max(floor);
        self
    }
}

/// A crisis hotline or support resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisResource {
    pub name: String,
    pub region: String,
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_line: Option<String>,
}

impl fmt::Display for CrisisResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.region, self.contact)?;
        if let Some(ref text_line) = self.text_line {
            write!(f, ", {}", text_line)?;
        }
        Ok(())
    }
}

/// Kind of escalation, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationKind {
    None,
    InjectResources,
    NotifyEmergencyContact,
}

impl EscalationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationKind::None => "none",
            EscalationKind::InjectResources => "inject_resources",
            EscalationKind::NotifyEmergencyContact => "notify_emergency_contact",
        }
    }
}

/// Action taken in response to a risk level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationAction {
    None,
    InjectResources {
        resources: Vec<CrisisResource>,
    },
    NotifyEmergencyContact {
        resources: Vec<CrisisResource>,
        message: String,
    },
}

impl EscalationAction {
    pub fn kind(&self) -> EscalationKind {
        match self {
            EscalationAction::None => EscalationKind::None,
            EscalationAction::InjectResources { .. } => EscalationKind::InjectResources,
            EscalationAction::NotifyEmergencyContact { .. } => {
                EscalationKind::NotifyEmergencyContact
            }
        }
    }

    pub fn resources(&self) -> &[CrisisResource] {
        match self {
            EscalationAction::None => &[],
            EscalationAction::InjectResources { resources }
            | EscalationAction::NotifyEmergencyContact { resources, .. } => resources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(RiskLevel::None < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_at_least_never_lowers() {
        let assessment = RiskAssessment {
            level: RiskLevel::High,
            matched_signals: vec!["hopeless".to_string()],
            score: 5.0,
        };
        assert_eq!(assessment.clone().at_least(RiskLevel::Moderate).level, RiskLevel::High);
        assert_eq!(RiskAssessment::none().at_least(RiskLevel::Moderate).level, RiskLevel::Moderate);
    }

    #[test]
    fn test_action_serializes_with_kind_tag() {
        let action = EscalationAction::InjectResources {
            resources: vec![CrisisResource {
                name: "988 Suicide & Crisis Lifeline".to_string(),
                region: "US".to_string(),
                contact: "988".to_string(),
                text_line: None,
            }],
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"], "inject_resources");
        assert_eq!(json["resources"][0]["contact"], "988");
        assert_eq!(action.kind(), EscalationKind::InjectResources);
    }
}
