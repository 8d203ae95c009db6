//! Crisis detection policy and escalation settings
//!
//! The phrase weights and thresholds are policy, not clinically validated
//! constants. Deployments are expected to tune them.

use crate::providers::has_key;
use crate::{env_var, ConfigError};
use safespace_core::CrisisResource;
use serde::{Deserialize, Serialize};

/// A risk-indicating phrase and its severity weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPhrase {
    pub phrase: String,
    pub weight: f32,
}

impl WeightedPhrase {
    pub fn new(phrase: impl Into<String>, weight: f32) -> Self {
        Self {
            phrase: phrase.into(),
            weight,
        }
    }
}

/// Minimum score for each risk level. Scores below `low` map to none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_low")]
    pub low: f32,
    #[serde(default = "default_moderate")]
    pub moderate: f32,
    #[serde(default = "default_high")]
    pub high: f32,
    #[serde(default = "default_critical")]
    pub critical: f32,
}

fn default_low() -> f32 {
    1.0
}
fn default_moderate() -> f32 {
    3.0
}
fn default_high() -> f32 {
    5.0
}
fn default_critical() -> f32 {
    10.0
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: default_low(),
            moderate: default_moderate(),
            high: default_high(),
            critical: default_critical(),
        }
    }
}

/// Crisis detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisConfig {
    #[serde(default = "default_phrases")]
    pub phrases: Vec<WeightedPhrase>,

    #[serde(default)]
    pub thresholds: RiskThresholds,

    /// Prompt sent with images to obtain a scannable description
    #[serde(default = "default_image_prompt")]
    pub image_prompt: String,

    /// Language hint passed to speech-to-text
    #[serde(default)]
    pub transcription_language: Option<String>,
}

const HIGH_SEVERITY: &[&str] = &[
    "suicide",
    "kill myself",
    "end it all",
    "want to die",
    "hurt myself",
    "harm myself",
    "self harm",
    "no point",
    "can't go on",
];

const MEDIUM_SEVERITY: &[&str] = &[
    "hopeless",
    "worthless",
    "give up",
    "can't cope",
    "everything is wrong",
    "no one cares",
    "alone",
];

const LOW_SEVERITY: &[&str] = &["crisis", "emergency", "help me"];

fn default_phrases() -> Vec<WeightedPhrase> {
    let weighted = |phrases: &[&str], weight: f32| -> Vec<WeightedPhrase> {
        phrases.iter().map(|p| WeightedPhrase::new(*p, weight)).collect()
    };
    let mut phrases = weighted(HIGH_SEVERITY, 5.0);
    phrases.extend(weighted(MEDIUM_SEVERITY, 3.0));
    phrases.extend(weighted(LOW_SEVERITY, 1.0));
    phrases
}

fn default_image_prompt() -> String {
    "Describe this image as a therapist would: the setting, any people and their apparent \
     emotional state, and anything suggesting distress, self-harm or danger. Be factual and concise."
        .to_string()
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            phrases: default_phrases(),
            thresholds: RiskThresholds::default(),
            image_prompt: default_image_prompt(),
            transcription_language: None,
        }
    }
}

impl CrisisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phrases.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "crisis.phrases".to_string(),
                message: "At least one phrase is required".to_string(),
            });
        }

        for phrase in &self.phrases {
            if phrase.phrase.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "crisis.phrases".to_string(),
                    message: "Phrases must not be blank".to_string(),
                });
            }
            if !(phrase.weight.is_finite() && phrase.weight > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: "crisis.phrases".to_string(),
                    message: format!(
                        "Weight for '{}' must be positive, got {}",
                        phrase.phrase, phrase.weight
                    ),
                });
            }
        }

        let t = &self.thresholds;
        let ladder = [
            ("low", t.low),
            ("moderate", t.moderate),
            ("high", t.high),
            ("critical", t.critical),
        ];
        if ladder.iter().any(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "crisis.thresholds".to_string(),
                message: "Thresholds must be finite and non-negative".to_string(),
            });
        }
        for pair in ladder.windows(2) {
            if pair[1].1 < pair[0].1 {
                return Err(ConfigError::InvalidValue {
                    field: format!("crisis.thresholds.{}", pair[1].0),
                    message: format!("Must be >= {} threshold ({})", pair[0].0, pair[0].1),
                });
            }
        }

        Ok(())
    }
}

/// How the emergency contact is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMode {
    #[default]
    Call,
    Sms,
}

/// Twilio credentials and destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default = "default_account_sid")]
    pub account_sid: Option<String>,
    #[serde(default = "default_auth_token")]
    pub auth_token: Option<String>,
    #[serde(default = "default_from_number")]
    pub from_number: Option<String>,
    #[serde(default = "default_emergency_contact")]
    pub emergency_contact: Option<String>,
    /// TwiML document played on the outbound call
    #[serde(default = "default_twiml_url")]
    pub twiml_url: String,
    #[serde(default = "default_twilio_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub mode: NotificationMode,
}

fn default_account_sid() -> Option<String> {
    env_var("TWILIO_ACCOUNT_SID")
}
fn default_auth_token() -> Option<String> {
    env_var("TWILIO_AUTH_TOKEN")
}
fn default_from_number() -> Option<String> {
    env_var("TWILIO_FROM_NUMBER")
}
fn default_emergency_contact() -> Option<String> {
    env_var("EMERGENCY_CONTACT")
}
fn default_twiml_url() -> String {
    "http://demo.twilio.com/docs/voice.xml".to_string()
}
fn default_twilio_endpoint() -> String {
    "https://api.twilio.com".to_string()
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: default_account_sid(),
            auth_token: default_auth_token(),
            from_number: default_from_number(),
            emergency_contact: default_emergency_contact(),
            twiml_url: default_twiml_url(),
            endpoint: default_twilio_endpoint(),
            mode: NotificationMode::default(),
        }
    }
}

impl TwilioConfig {
    /// All four credentials are present
    pub fn is_configured(&self) -> bool {
        has_key(&self.account_sid)
            && has_key(&self.auth_token)
            && has_key(&self.from_number)
            && has_key(&self.emergency_contact)
    }
}

/// Escalation resources, messages and the notification collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "default_resources")]
    pub resources: Vec<CrisisResource>,

    /// Prefixed to the reply when the emergency contact is notified
    #[serde(default = "default_immediate_message")]
    pub immediate_message: String,

    /// Shown to the user when the emergency notification fails
    #[serde(default = "default_failure_message")]
    pub notification_failure_message: String,

    /// Log alerts instead of calling Twilio (development only)
    #[serde(default)]
    pub simulate_notifications: bool,

    #[serde(default)]
    pub twilio: TwilioConfig,
}

fn default_resources() -> Vec<CrisisResource> {
    vec![
        CrisisResource {
            name: "988 Suicide & Crisis Lifeline".to_string(),
            region: "US".to_string(),
            contact: "Call or text 988".to_string(),
            text_line: Some("Crisis Text Line: text HOME to 741741".to_string()),
        },
        CrisisResource {
            name: "Samaritans".to_string(),
            region: "UK".to_string(),
            contact: "Call 116 123".to_string(),
            text_line: Some("Shout: text SHOUT to 85258".to_string()),
        },
        CrisisResource {
            name: "Find A Helpline".to_string(),
            region: "International".to_string(),
            contact: "https://findahelpline.com".to_string(),
            text_line: None,
        },
    ]
}

fn default_immediate_message() -> String {
    "I'm very concerned about you right now. Your safety is the most important thing.".to_string()
}

fn default_failure_message() -> String {
    "There was an error initiating the emergency call. Please contact emergency services directly."
        .to_string()
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            resources: default_resources(),
            immediate_message: default_immediate_message(),
            notification_failure_message: default_failure_message(),
            simulate_notifications: false,
            twilio: TwilioConfig::default(),
        }
    }
}

impl EscalationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resources.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "escalation.resources".to_string(),
                message: "At least one crisis resource is required".to_string(),
            });
        }
        if self.immediate_message.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "escalation.immediate_message".to_string(),
                message: "Must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let crisis = CrisisConfig::default();
        assert!(crisis.validate().is_ok());
        assert_eq!(crisis.phrases.len(), 19);
        assert_eq!(crisis.phrases[0], WeightedPhrase::new("suicide", 5.0));
    }

    #[test]
    fn test_descending_thresholds_rejected() {
        let mut crisis = CrisisConfig::default();
        crisis.thresholds.high = 2.0;
        let err = crisis.validate().unwrap_err();
        assert!(err.to_string().contains("crisis.thresholds.high"));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        let mut crisis = CrisisConfig::default();
        crisis.phrases.push(WeightedPhrase::new("sad", 0.0));
        assert!(crisis.validate().is_err());
    }

    #[test]
    fn test_twilio_requires_all_credentials() {
        let mut twilio = TwilioConfig {
            account_sid: Some("AC123".to_string()),
            auth_token: Some("token".to_string()),
            from_number: Some("+15550001111".to_string()),
            emergency_contact: None,
            ..TwilioConfig::default()
        };
        assert!(!twilio.is_configured());
        twilio.emergency_contact = Some("+15550002222".to_string());
        assert!(twilio.is_configured());
    }

    #[test]
    fn test_default_resources() {
        let escalation = EscalationConfig::default();
        assert!(escalation.validate().is_ok());
        assert_eq!(escalation.resources[1].region, "UK");
        assert!(escalation.notification_failure_message.contains("emergency services"));
    }
}
