//! Session state
//!
//! One process-wide map from session id to an append-only `SessionRecord`.
//! The map lock is held only for lookup and insert; each record has its own
//! mutex so sessions never contend with each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use safespace_core::{
    ConversationTurn, Interaction, Message, ProviderResult, RiskLevel, SessionRecord,
    SessionSummary, TurnRole,
};

/// Anything that can be appended to a session
#[derive(Debug, Clone)]
pub enum SessionEntry {
    Interaction(Interaction),
    ProviderResult(ProviderResult),
    Turn(ConversationTurn),
}

impl From<Interaction> for SessionEntry {
    fn from(interaction: Interaction) -> Self {
        SessionEntry::Interaction(interaction)
    }
}

impl From<ProviderResult> for SessionEntry {
    fn from(result: ProviderResult) -> Self {
        SessionEntry::ProviderResult(result)
    }
}

impl From<ConversationTurn> for SessionEntry {
    fn from(turn: ConversationTurn) -> Self {
        SessionEntry::Turn(turn)
    }
}

/// Shared handle to one session record
pub type SessionHandle = Arc<Mutex<SessionRecord>>;

/// Process-lifetime session store
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session, creating it on first use
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().get(session_id) {
            return handle.clone();
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id = %session_id, "Created session");
                Arc::new(Mutex::new(SessionRecord::new(session_id)))
            })
            .clone()
    }

    fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Append an entry to the session, creating the session if needed
    pub fn append(&self, session_id: &str, entry: impl Into<SessionEntry>) {
        let handle = self.get_or_create(session_id);
        push(&mut handle.lock(), entry.into());
    }

    /// Append entries under a single lock so they stay adjacent
    pub fn append_all(&self, session_id: &str, entries: impl IntoIterator<Item = SessionEntry>) {
        let handle = self.get_or_create(session_id);
        let mut record = handle.lock();
        for entry in entries {
            push(&mut record, entry);
        }
    }

    /// Append only if the session already exists; returns whether it did
    pub fn append_existing(&self, session_id: &str, entry: impl Into<SessionEntry>) -> bool {
        match self.get(session_id) {
            Some(handle) => {
                push(&mut handle.lock(), entry.into());
                true
            }
            None => false,
        }
    }

    /// Track the highest risk level seen in the session
    pub fn note_risk(&self, session_id: &str, level: RiskLevel) {
        if let Some(handle) = self.get(session_id) {
            let mut record = handle.lock();
            record.peak_risk = record.peak_risk.max(level);
        }
    }

    /// Interactions in submission order; empty for unknown sessions
    pub fn history(&self, session_id: &str) -> Vec<Interaction> {
        self.get(session_id)
            .map(|h| h.lock().interactions.clone())
            .unwrap_or_default()
    }

    /// Provider attempts in dispatch order; empty for unknown sessions
    pub fn provider_results(&self, session_id: &str) -> Vec<ProviderResult> {
        self.get(session_id)
            .map(|h| h.lock().provider_results.clone())
            .unwrap_or_default()
    }

    pub fn turns(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.get(session_id)
            .map(|h| h.lock().turns.clone())
            .unwrap_or_default()
    }

    /// The last `max_turns` conversation turns as chat messages
    pub fn context_messages(&self, session_id: &str, max_turns: usize) -> Vec<Message> {
        let Some(handle) = self.get(session_id) else {
            return Vec::new();
        };
        let record = handle.lock();
        let skip = record.turns.len().saturating_sub(max_turns);
        record.turns[skip..]
            .iter()
            .map(|turn| match turn.role {
                TurnRole::User => Message::user(turn.content.clone()),
                TurnRole::Assistant => Message::assistant(turn.content.clone()),
            })
            .collect()
    }

    /// Copy of the full record
    pub fn snapshot(&self, session_id: &str) -> Option<SessionRecord> {
        self.get(session_id).map(|h| h.lock().clone())
    }

    /// Remove the session, returning its summary if it existed
    pub fn clear(&self, session_id: &str) -> Option<SessionSummary> {
        let removed = self.sessions.write().remove(session_id)?;
        let summary = removed.lock().summary();
        tracing::info!(
            session_id = %session_id,
            interactions = summary.interaction_count,
            duration_secs = summary.duration_secs,
            "Cleared session"
        );
        Some(summary)
    }

    pub fn exists(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Session ids, sorted
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }
}

fn push(record: &mut SessionRecord, entry: SessionEntry) {
    match entry {
        SessionEntry::Interaction(interaction) => record.interactions.push(interaction),
        SessionEntry::ProviderResult(result) => record.provider_results.push(result),
        SessionEntry::Turn(turn) => record.turns.push(turn),
    }
}
