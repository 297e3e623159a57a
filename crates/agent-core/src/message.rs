//! Conversation Turns
//!
//! The turn format shared by the controller, the providers and the shell,
//! plus the append-only [`Transcript`] that serves as conversation memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions (never stored in a transcript)
    System,
    /// User input
    User,
    /// Agent (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "agent"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single turn in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Tool name, for tool turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::new(Role::Tool, content).with_name(tool_name)
    }

    /// Add a name to the message
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> u32 {
        // ~4 characters per token, +4 for role overhead
        u32::try_from(self.content.len() / 4).unwrap_or(u32::MAX).saturating_add(4)
    }
}

/// Ordered, append-only history of turns for one session.
///
/// Turns cannot be removed, reordered or edited once appended.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one turn
    pub fn push(&mut self, turn: Message) {
        self.turns.push(turn);
    }

    /// Append several turns in order
    pub fn extend(&mut self, turns: impl IntoIterator<Item = Message>) {
        self.turns.extend(turns);
    }

    /// All turns, oldest first
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Get the last turn
    pub fn last(&self) -> Option<&Message> {
        self.turns.last()
    }

    /// Estimate total tokens in the transcript
    pub fn estimate_tokens(&self) -> u32 {
        self.turns.iter().map(Message::estimate_tokens).sum()
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.name.is_none());

        let tool = Message::tool("1. Paris", "web_search");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.name.as_deref(), Some("web_search"));
    }

    #[test]
    fn test_transcript_keeps_insertion_order() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("Hi"));
        transcript.extend([Message::tool("result", "web_search"), Message::assistant("Hello!")]);

        let roles: Vec<Role> = transcript.turns().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Assistant]);
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last().unwrap().content, "Hello!");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Assistant.to_string(), "agent");
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn test_token_estimate() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.estimate_tokens(), 0);
        transcript.push(Message::user("12345678"));
        assert_eq!(transcript.estimate_tokens(), 6);
    }
}
