//! # agent-core
//!
//! Core agent logic for MiniResearchAgent: append-only conversation memory,
//! a provider seam for the reasoning model, a tool seam for search, and the
//! bounded reason-then-act controller that ties them together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐   │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider        │   │
//! │  │    Loop     │──│   Registry  │──│   (reasoning client) │   │
//! │  └─────────────┘  └─────────────┘  └──────────────────────┘   │
//! │         │                                                     │
//! │  ┌─────────────┐                                              │
//! │  │ Transcript  │  appended once per successful turn           │
//! │  └─────────────┘                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use error::{AgentError, ErrorKind, Result};
pub use message::{Message, Role, Transcript};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig};
pub use session::{Session, SessionId};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
