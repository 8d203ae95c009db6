//! Prompt building for the therapist persona

use safespace_config::PersonaConfig;
use safespace_core::{CrisisResource, Message};

/// Builder for chat prompts
pub struct PromptBuilder {
    messages: Vec<Message>,
    persona: PersonaConfig,
    system_additions: Vec<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            persona: PersonaConfig::default(),
            system_additions: Vec::new(),
        }
    }

    pub fn with_persona(mut self, persona: PersonaConfig) -> Self {
        self.persona = persona;
        self
    }

    /// Ask the model to weave crisis resources into its reply
    pub fn with_resources(mut self, resources: &[CrisisResource]) -> Self {
        if resources.is_empty() {
            return self;
        }
        let list = resources
            .iter()
            .map(|r| format!("- {}", r))
            .collect::<Vec<_>>()
            .join("\n");
        self.system_additions.push(format!(
            "## Support Resources\nThe user may be struggling. Gently mention these resources in your reply:\n{}",
            list
        ));
        self
    }

    /// Tell the model that an emergency escalation is under way
    pub fn with_crisis_guidance(mut self) -> Self {
        self.system_additions.push(
            "## Safety First\nThe user may be in immediate danger. Prioritise their safety: \
             acknowledge their pain, encourage them to reach out to emergency services or a \
             crisis line now, and stay with them in the conversation. Do not minimise what they said."
                .to_string(),
        );
        self
    }

    /// Add prior conversation turns
    pub fn with_history(mut self, history: &[Message]) -> Self {
        self.messages.extend_from_slice(history);
        self
    }

    pub fn user_message(mut self, message: &str) -> Self {
        self.messages.push(Message::user(message));
        self
    }

    fn system_prompt(&self) -> String {
        let mut system = format!(
            r#"You are {name}, {role}.
Respond to people with:

1. Emotional attunement ("I can sense how difficult this must be...")
2. Gentle normalization ("Many people feel this way when...")
3. Practical guidance ("What sometimes helps is...")
4. Strengths-focused support ("I notice how you're...")

Key principles:
- Never use brackets or labels
- Blend elements seamlessly and vary sentence structure
- Mirror the user's language level
- Keep the conversation going with open-ended questions that explore the root of their difficulty
- You are a supportive companion, not a replacement for professional care"#,
            name = self.persona.name,
            role = self.persona.role,
        );
        for addition in &self.system_additions {
            system.push_str("\n\n");
            system.push_str(addition);
        }
        system
    }

    /// Build the message list, system prompt first
    pub fn build(self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::system(self.system_prompt()));
        messages.extend(self.messages);
        messages
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safespace_core::Role;

    #[test]
    fn test_basic_prompt() {
        let messages = PromptBuilder::new().user_message("I feel stuck").build();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Dr. Emily Hartman"));
        assert_eq!(messages[1].content, "I feel stuck");
    }

    #[test]
    fn test_history_precedes_user_message() {
        let history = vec![Message::user("hi"), Message::assistant("Hello, how are you?")];
        let messages = PromptBuilder::new()
            .with_history(&history)
            .user_message("not great")
            .build();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[3].content, "not great");
    }

    #[test]
    fn test_resources_in_system_prompt() {
        let resources = vec![CrisisResource {
            name: "Samaritans".to_string(),
            region: "UK".to_string(),
            contact: "Call 116 123".to_string(),
            text_line: None,
        }];
        let messages = PromptBuilder::new()
            .with_resources(&resources)
            .with_crisis_guidance()
            .user_message("help")
            .build();
        assert!(messages[0].content.contains("Samaritans (UK): Call 116 123"));
        assert!(messages[0].content.contains("Safety First"));
    }
}
