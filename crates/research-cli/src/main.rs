//! MiniResearchAgent CLI
//!
//! Interactive research assistant: Gemini for reasoning, DuckDuckGo for
//! web search, and an in-memory transcript for conversation context.
//!
//! Configuration comes from the environment (and `.env`); see `config.rs`.
//! Logs go to stderr, filtered by `RUST_LOG` (default `warn`).

mod config;
mod shell;

use std::io::IsTerminal;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{Agent, AgentBuilder, LlmProvider};
use agent_runtime::{GeminiProvider, WebSearchTool};

use crate::config::AppConfig;
use crate::shell::{LineReader, LineSource, Shell, Terminal};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(model = %config.generation.model, "Configuration loaded");

    // Initialize LLM provider
    let provider = Arc::new(GeminiProvider::new(config.gemini)?);

    // Verify the key before the first question
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to Gemini"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Gemini not reachable or key rejected - questions will fail");
            tracing::warn!("  Check GEMINI_API_KEY and your network connection");
        }
    }

    let agent = AgentBuilder::new()
        .provider(provider)
        .generation(config.generation)
        .tool(WebSearchTool::new(config.search)?)
        .build()?;

    tracing::info!("Registered {} tools:", agent.tools().len());
    for name in agent.tools().names() {
        tracing::info!("  • {}", name);
    }

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        run_shell(agent, Terminal::new()?).await
    } else {
        run_shell(agent, LineReader::new(stdin.lock())).await
    }
}

async fn run_shell(agent: Agent, input: impl LineSource) -> anyhow::Result<()> {
    let mut shell = Shell::new(agent, input, std::io::stdout());
    shell.run().await?;

    let session = shell.session();
    tracing::info!(
        session = %session.id,
        turns = session.completed_turns(),
        messages = session.message_count(),
        duration_secs = session.duration().num_seconds(),
        "Session ended"
    );

    Ok(())
}
