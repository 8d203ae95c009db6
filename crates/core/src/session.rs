//! Session records and conversation turns

use crate::{Interaction, Modality, ProviderResult, RiskLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of the chat context fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only history of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub interactions: Vec<Interaction>,
    pub provider_results: Vec<ProviderResult>,
    pub turns: Vec<ConversationTurn>,
    pub peak_risk: RiskLevel,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: Utc::now(),
            interactions: Vec::new(),
            provider_results: Vec::new(),
            turns: Vec::new(),
            peak_risk: RiskLevel::None,
        }
    }

    /// Summarize the session, as reported when it is cleared
    pub fn summary(&self) -> SessionSummary {
        let modalities_used: BTreeSet<Modality> =
            self.interactions.iter().map(Interaction::modality).collect();
        SessionSummary {
            session_id: self.session_id.clone(),
            duration_secs: (Utc::now() - self.created_at).num_seconds().max(0) as u64,
            interaction_count: self.interactions.len(),
            modalities_used: modalities_used.into_iter().collect(),
            provider_attempts: self.provider_results.len(),
            peak_risk: self.peak_risk,
        }
    }
}

/// Summary of a cleared session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub duration_secs: u64,
    pub interaction_count: usize,
    pub modalities_used: Vec<Modality>,
    pub provider_attempts: usize,
    pub peak_risk: RiskLevel,
}
