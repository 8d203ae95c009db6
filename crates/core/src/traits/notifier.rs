//! Emergency notification collaborator

use crate::{Result, RiskLevel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert sent to the emergency contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub session_id: String,
    pub level: RiskLevel,
    pub signals: Vec<String>,
    pub message: String,
}

/// Proof that a notification was accepted by the collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationReceipt {
    pub notifier: String,
    /// Identifier assigned by the remote service
    pub reference: String,
    pub simulated: bool,
    pub sent_at: DateTime<Utc>,
}

/// Phone/SMS notification service used for high-risk escalations
#[async_trait]
pub trait EmergencyNotifier: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Notify the emergency contact.
    ///
    /// Errors must be `Error::EscalationNotificationFailed`.
    async fn notify(&self, alert: &EmergencyAlert) -> Result<NotificationReceipt>;
}
