//! Session Management
//!
//! One interactive session: an id, the transcript, and activity timestamps.
//! Sessions live in memory only and end with the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::message::Transcript;
use crate::reasoning::Agent;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A complete agent session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    transcript: Transcript,
    completed_turns: usize,
}

impl Session {
    /// Create a new session
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            created_at: now,
            updated_at: now,
            transcript: Transcript::new(),
            completed_turns: 0,
        }
    }

    /// Run one user turn through the agent against this session's memory
    pub async fn ask(&mut self, agent: &Agent, query: &str) -> Result<String> {
        self.touch();
        let answer = agent.run_turn(&mut self.transcript, query).await?;
        self.completed_turns += 1;
        Ok(answer)
    }

    /// Conversation memory so far
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Number of turns that produced an answer
    pub const fn completed_turns(&self) -> usize {
        self.completed_turns
    }

    /// Turn count in the transcript (user, tool and agent turns)
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// Duration since creation
    pub fn duration(&self) -> chrono::Duration {
        self.updated_at - self.created_at
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::message::Message;
    use crate::provider::{Completion, GenerationOptions, LlmProvider};
    use crate::tool::ToolRegistry;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedProvider(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _: &[Message], options: &GenerationOptions) -> Result<Completion> {
            match self.0 {
                Ok(text) => Ok(Completion::text(text, options.model.clone())),
                Err(msg) => Err(AgentError::Provider(msg.into())),
            }
        }
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new();
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.completed_turns(), 0);
        assert_ne!(session.id, Session::new().id);
    }

    #[tokio::test]
    async fn test_ask_counts_completed_turns() {
        let agent = Agent::with_defaults(
            Arc::new(FixedProvider(Ok("Final Answer: hi"))),
            Arc::new(ToolRegistry::new()),
        );
        let mut session = Session::new();

        assert_eq!(session.ask(&agent, "hello").await.unwrap(), "hi");
        assert_eq!(session.completed_turns(), 1);
        assert_eq!(session.message_count(), 2);
        assert!(session.updated_at >= session.created_at);
    }

    #[tokio::test]
    async fn test_failed_ask_keeps_state() {
        let agent = Agent::with_defaults(
            Arc::new(FixedProvider(Err("boom"))),
            Arc::new(ToolRegistry::new()),
        );
        let mut session = Session::new();

        assert!(session.ask(&agent, "hello").await.is_err());
        assert_eq!(session.completed_turns(), 0);
        assert_eq!(session.message_count(), 0);
    }
}
