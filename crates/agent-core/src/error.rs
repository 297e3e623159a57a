//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Broad classification used by the shell and in logs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration, detected at startup
    Config,
    /// Reasoning endpoint failure
    Provider,
    /// Search (or other tool) failure
    Tool,
    /// Anything else
    Other,
}

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Provider answered with something we could not use
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// The model kept asking for tools after the per-turn cap was reached
    #[error("Tool call limit ({0}) reached without a final answer")]
    ToolBudgetExhausted(usize),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Classify the error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Provider(_)
            | Self::ProviderUnavailable(_)
            | Self::Auth(_)
            | Self::RateLimited(_)
            | Self::InvalidResponse(_) => ErrorKind::Provider,
            Self::ToolNotFound(_)
            | Self::ToolValidation(_)
            | Self::ToolExecution(_)
            | Self::ToolBudgetExhausted(_) => ErrorKind::Tool,
            Self::Json(_) => ErrorKind::Other,
        }
    }
}
