//! # agent-runtime
//!
//! Concrete collaborators for the MiniResearchAgent controller.
//!
//! ## Components
//!
//! - **Gemini**: hosted reasoning client implementing `LlmProvider`
//! - **Web search**: DuckDuckGo HTML search implementing `Tool`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{ApiKey, GeminiConfig, GeminiProvider, SearchConfig, WebSearchTool};
//!
//! let provider = GeminiProvider::new(GeminiConfig::new(ApiKey::new(key)?))?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .tool(WebSearchTool::new(SearchConfig::default())?)
//!     .build()?;
//! ```

pub mod gemini;
pub mod search;

pub use gemini::{ApiKey, GeminiConfig, GeminiProvider};
pub use search::{SearchConfig, SearchHit, WebSearchTool};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentBuilder, AgentError, LlmProvider, Message, Result, Role, Session, Tool,
    ToolRegistry,
};
