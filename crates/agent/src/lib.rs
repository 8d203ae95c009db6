//! Interaction orchestration for SafeSpace
//!
//! Features:
//! - Fallback dispatch over an ordered provider list per capability
//! - Keyword-based crisis detection over text, transcripts and image descriptions
//! - Escalation policy from risk level to action
//! - Process-wide session state with append-only histories
//! - The interaction orchestrator tying these together

pub mod crisis;
pub mod dispatcher;
pub mod escalation;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod validation;

mod metrics;

pub use crisis::{CrisisDetector, CrisisPolicy, Inspection};
pub use dispatcher::Dispatcher;
pub use escalation::{resource_block, EscalationPolicy};
pub use orchestrator::{
    AudioPart, ImagePart, InteractionFailure, InteractionOrchestrator, InteractionReply,
    InteractionRequest, InteractionResponse, InteractionStage, MultimodalReply,
    MultimodalRequest, MultimodalResponse, NotificationOutcome, SynthesisReply,
};
pub use registry::ProviderRegistry;
pub use session::{SessionEntry, SessionStore};
