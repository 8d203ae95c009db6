//! Core traits and types for SafeSpace
//!
//! This crate provides foundational types used across all other crates:
//! - Interactions and their payloads (text, image, audio)
//! - Capability requests and provider results
//! - Risk assessments and escalation actions
//! - Session records and conversation turns
//! - The `Provider` and `EmergencyNotifier` traits
//! - Error types

pub mod capability;
pub mod error;
pub mod interaction;
pub mod llm_types;
pub mod risk;
pub mod session;
pub mod traits;

mod encoding;

pub use capability::{Capability, CapabilityRequest, ProviderContent, ProviderResult};
pub use error::{Error, Result};
pub use interaction::{Interaction, Modality, Payload};
pub use llm_types::{Message, Role};
pub use risk::{CrisisResource, EscalationAction, EscalationKind, RiskAssessment, RiskLevel};
pub use session::{ConversationTurn, SessionRecord, SessionSummary, TurnRole};
pub use traits::{EmergencyAlert, EmergencyNotifier, NotificationReceipt, Provider};
