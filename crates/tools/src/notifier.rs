//! Emergency notifier implementations

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use uuid::Uuid;

use safespace_config::{EscalationConfig, NotificationMode, TwilioConfig};
use safespace_core::{EmergencyAlert, EmergencyNotifier, NotificationReceipt};

use crate::ToolError;

/// Select the notifier for the configured escalation settings
pub fn build_notifier(config: &EscalationConfig) -> Arc<dyn EmergencyNotifier> {
    if config.simulate_notifications {
        tracing::warn!("Emergency notifications are SIMULATED, no one will be contacted");
        return Arc::new(SimulatedNotifier::new());
    }

    match TwilioNotifier::new(config.twilio.clone()) {
        Ok(notifier) => {
            tracing::info!(mode = ?config.twilio.mode, "Twilio emergency notifier configured");
            Arc::new(notifier)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                "No emergency notifier available, high-risk escalations will fail"
            );
            Arc::new(UnconfiguredNotifier)
        }
    }
}

#[derive(Debug, Deserialize)]
struct TwilioResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

/// Twilio voice-call / SMS notifier
pub struct TwilioNotifier {
    account_sid: String,
    auth_token: String,
    from_number: String,
    to_number: String,
    twiml_url: String,
    endpoint: String,
    mode: NotificationMode,
    client: reqwest::Client,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self, ToolError> {
        let missing = |name: &str| ToolError::NotConfigured(format!("Twilio {} is not set", name));
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let account_sid = non_empty(config.account_sid).ok_or_else(|| missing("account SID"))?;
        let auth_token = non_empty(config.auth_token).ok_or_else(|| missing("auth token"))?;
        let from_number = non_empty(config.from_number).ok_or_else(|| missing("from number"))?;
        let to_number =
            non_empty(config.emergency_contact).ok_or_else(|| missing("emergency contact"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ToolError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            account_sid,
            auth_token,
            from_number,
            to_number,
            twiml_url: config.twiml_url,
            endpoint: config.endpoint,
            mode: config.mode,
            client,
        })
    }

    fn resource_url(&self) -> String {
        let resource = match self.mode {
            NotificationMode::Call => "Calls",
            NotificationMode::Sms => "Messages",
        };
        format!(
            "{}/2010-04-01/Accounts/{}/{}.json",
            self.endpoint.trim_end_matches('/'),
            self.account_sid,
            resource
        )
    }

    fn form(&self, alert: &EmergencyAlert) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("To", self.to_number.clone()),
            ("From", self.from_number.clone()),
        ];
        match self.mode {
            NotificationMode::Call => form.push(("Url", self.twiml_url.clone())),
            NotificationMode::Sms => form.push(("Body", sms_body(alert))),
        }
        form
    }

    async fn send(&self, alert: &EmergencyAlert) -> Result<TwilioResource, ToolError> {
        let response = self
            .client
            .post(self.resource_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.form(alert))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TwilioErrorBody>(&body)
                .ok()
                .and_then(|e| {
                    e.message
                        .map(|m| format!("{} (code {})", m, e.code.unwrap_or_default()))
                })
                .unwrap_or(body);
            return Err(ToolError::Api(format!("HTTP {}: {}", status, detail)));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))
    }
}

fn sms_body(alert: &EmergencyAlert) -> String {
    let signals = if alert.signals.is_empty() {
        "none recorded".to_string()
    } else {
        alert.signals.join(", ")
    };
    format!(
        "SafeSpace alert: a user (session {}) was assessed at {} risk. Signals: {}. Please reach out to them now.",
        alert.session_id, alert.level, signals
    )
}

#[async_trait]
impl EmergencyNotifier for TwilioNotifier {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn notify(&self, alert: &EmergencyAlert) -> safespace_core::Result<NotificationReceipt> {
        let resource = self.send(alert).await?;

        tracing::warn!(
            session_id = %alert.session_id,
            level = %alert.level,
            sid = %resource.sid,
            status = resource.status.as_deref().unwrap_or("unknown"),
            "Emergency contact notified"
        );

        Ok(NotificationReceipt {
            notifier: "twilio".to_string(),
            reference: resource.sid,
            simulated: false,
            sent_at: Utc::now(),
        })
    }
}

/// Notifier that records alerts without contacting anyone
#[derive(Default)]
pub struct SimulatedNotifier {
    sent: Mutex<Vec<EmergencyAlert>>,
}

impl SimulatedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts recorded so far
    pub fn sent(&self) -> Vec<EmergencyAlert> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl EmergencyNotifier for SimulatedNotifier {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn notify(&self, alert: &EmergencyAlert) -> safespace_core::Result<NotificationReceipt> {
        let reference = format!("SIM-{}", Uuid::new_v4());
        tracing::warn!(
            session_id = %alert.session_id,
            level = %alert.level,
            reference = %reference,
            "SIMULATED emergency notification"
        );
        self.sent.lock().push(alert.clone());

        Ok(NotificationReceipt {
            notifier: "simulated".to_string(),
            reference,
            simulated: true,
            sent_at: Utc::now(),
        })
    }
}

/// Stand-in used when no notifier could be configured
pub struct UnconfiguredNotifier;

#[async_trait]
impl EmergencyNotifier for UnconfiguredNotifier {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn notify(&self, _alert: &EmergencyAlert) -> safespace_core::Result<NotificationReceipt> {
        Err(safespace_core::Error::EscalationNotificationFailed(
            "no emergency notifier configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safespace_core::{Error, RiskLevel};

    fn alert() -> EmergencyAlert {
        EmergencyAlert {
            session_id: "s1".to_string(),
            level: RiskLevel::Critical,
            signals: vec!["suicide".to_string(), "want to die".to_string()],
            message: "concerned".to_string(),
        }
    }

    fn twilio_config() -> TwilioConfig {
        TwilioConfig {
            account_sid: Some("AC123".to_string()),
            auth_token: Some("secret".to_string()),
            from_number: Some("+15550001111".to_string()),
            emergency_contact: Some("+15550002222".to_string()),
            ..TwilioConfig::default()
        }
    }

    #[test]
    fn test_twilio_requires_credentials() {
        let config = TwilioConfig {
            auth_token: None,
            ..twilio_config()
        };
        assert!(matches!(TwilioNotifier::new(config), Err(ToolError::NotConfigured(_))));
    }

    #[test]
    fn test_resource_url_by_mode() {
        let notifier = TwilioNotifier::new(twilio_config()).unwrap();
        assert_eq!(
            notifier.resource_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Calls.json"
        );

        let sms = TwilioNotifier::new(TwilioConfig {
            mode: NotificationMode::Sms,
            ..twilio_config()
        })
        .unwrap();
        assert!(sms.resource_url().ends_with("/Messages.json"));
        let form = sms.form(&alert());
        assert!(form.iter().any(|(k, v)| *k == "Body" && v.contains("critical risk")));
    }

    #[test]
    fn test_build_notifier_selection() {
        let mut config = EscalationConfig {
            twilio: TwilioConfig {
                account_sid: None,
                ..twilio_config()
            },
            ..EscalationConfig::default()
        };
        assert_eq!(build_notifier(&config).name(), "unconfigured");

        config.simulate_notifications = true;
        assert_eq!(build_notifier(&config).name(), "simulated");

        config.simulate_notifications = false;
        config.twilio = twilio_config();
        assert_eq!(build_notifier(&config).name(), "twilio");
    }

    #[tokio::test]
    async fn test_simulated_notifier_records_alerts() {
        let notifier = SimulatedNotifier::new();
        let receipt = notifier.notify(&alert()).await.unwrap();
        assert!(receipt.simulated);
        assert!(receipt.reference.starts_with("SIM-"));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_fails_loudly() {
        let result = UnconfiguredNotifier.notify(&alert()).await;
        assert!(matches!(result, Err(Error::EscalationNotificationFailed(_))));
    }
}
