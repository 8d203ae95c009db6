//! Traits implemented by provider clients and notification collaborators

mod notifier;
mod provider;

pub use notifier::{EmergencyAlert, EmergencyNotifier, NotificationReceipt};
pub use provider::Provider;
