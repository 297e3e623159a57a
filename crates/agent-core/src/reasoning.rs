//! Reasoning Loop
//!
//! A bounded ReAct (Reason + Act) controller. Per user turn the model is
//! asked for an answer; if it asks for a tool instead, the tool runs and the
//! model is asked again with the observation, up to `max_tool_calls` times.
//!
//! The transcript is only touched once the turn has produced a final
//! answer: the user turn, any tool turns and the agent turn are appended
//! together. A failing provider or tool call leaves it exactly as it was.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::{Message, Transcript};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt preamble
    pub system_prompt: String,

    /// Maximum tool calls per user turn
    pub max_tool_calls: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_tool_calls: 1,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are MiniResearchAgent, a research assistant. \
Answer research and factual questions accurately and concisely, \
using the earlier conversation for context.";

const TOOL_FENCE: &str = "```tool";
const FENCE_END: &str = "```";
const FINAL_ANSWER: &str = "Final Answer:";
const THOUGHT: &str = "Thought:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";

/// Argument name a ReAct `Action Input:` line is bound to
const REACT_INPUT_ARG: &str = "query";

const CLOSING_DIRECTIVE: &str = "You have used all the tool calls allowed for this question. \
Do not request any more tools. Reply now with:\nFinal Answer: <your answer>";

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Build the full system prompt including tool descriptions
    fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
            prompt.push_str(&format!(
                "## How to respond\n\n\
                 If you need current or external information, reply with only a JSON block \
                 in this exact format:\n\
                 ```tool\n{{\"tool\": \"tool_name\", \"arguments\": {{\"query\": \"...\"}}}}\n```\n\n\
                 You may request at most {} tool call(s) per question.\n\
                 Once you have the tool results, or if you can answer directly, reply with:\n\
                 Final Answer: <your answer>",
                self.config.max_tool_calls
            ));
        }

        prompt
    }

    /// Assemble the request: instructions, memory, then this turn's exchange
    fn build_prompt(
        &self,
        transcript: &Transcript,
        exchange: &[Message],
        closing: bool,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(transcript.len() + exchange.len() + 2);
        messages.push(Message::system(self.build_system_prompt()));
        messages.extend(transcript.turns().iter().cloned());
        messages.extend(exchange.iter().cloned());
        if closing {
            messages.push(Message::system(CLOSING_DIRECTIVE));
        }
        messages
    }

    /// Run one user turn against the session transcript.
    ///
    /// Returns the final answer. On success the transcript gains the user
    /// turn, one tool turn per tool call, and the agent turn, in that order.
    /// On error it is left untouched.
    pub async fn run_turn(&self, transcript: &mut Transcript, query: &str) -> Result<String> {
        // What the model sees this turn, including its own tool requests
        let mut exchange = vec![Message::user(query)];
        // What gets committed to memory
        let mut pending = vec![Message::user(query)];
        let mut tool_calls = 0;

        tracing::debug!(
            history = transcript.len(),
            history_tokens = transcript.estimate_tokens(),
            "Starting turn"
        );

        let answer = loop {
            let closing = tool_calls >= self.config.max_tool_calls;
            let messages = self.build_prompt(transcript, &exchange, closing);

            let completion = self
                .provider
                .complete(&messages, &self.config.generation)
                .await?;

            if let Some(usage) = &completion.usage {
                tracing::debug!(
                    provider = self.provider.name(),
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Completion received"
                );
            }

            let content = completion.content;

            let Some(mut call) = parse_tool_call(&content) else {
                break final_answer(&content);
            };

            if closing {
                tracing::warn!(
                    tool = %call.name,
                    "Tool requested after the per-turn limit, ignoring"
                );
                let remainder = strip_tool_request(&content);
                if remainder.is_empty() {
                    return Err(AgentError::ToolBudgetExhausted(self.config.max_tool_calls));
                }
                break remainder;
            }

            if call.id.is_none() {
                call.id = Some(uuid::Uuid::new_v4().to_string());
            }
            tool_calls += 1;
            tracing::debug!(
                tool = %call.name,
                call_id = ?call.id,
                arguments = ?call.arguments,
                "Executing tool"
            );

            let result = self.tools.execute(&call).await?;
            if !result.success {
                return Err(AgentError::ToolExecution(format!(
                    "{} failed: {}",
                    result.name, result.output
                )));
            }
            tracing::debug!(tool = %call.name, observation = %result.output, "Tool returned");

            let observation = Message::tool(result.output, call.name);
            exchange.push(Message::assistant(content));
            exchange.push(observation.clone());
            pending.push(observation);
        };

        tracing::debug!(tool_calls, answer = %answer, "Final answer");

        pending.push(Message::assistant(answer.clone()));
        transcript.extend(pending);

        Ok(answer)
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Parse a tool request from an LLM response.
///
/// A response carrying a `Final Answer:` marker is never a tool request,
/// whatever markup it quotes.
pub fn parse_tool_call(content: &str) -> Option<ToolCall> {
    if content.contains(FINAL_ANSWER) {
        return None;
    }

    parse_fenced_tool_call(content)
        .or_else(|| parse_inline_tool_call(content))
        .or_else(|| parse_react_action(content))
}

/// Byte range of the ```tool ... ``` block and its JSON payload
fn find_tool_fence(content: &str) -> Option<(usize, usize, &str)> {
    let start = content.find(TOOL_FENCE)?;
    let body_start = start + TOOL_FENCE.len();
    let body_len = content[body_start..].find(FENCE_END)?;
    let end = body_start + body_len + FENCE_END.len();
    Some((start, end, content[body_start..body_start + body_len].trim()))
}

fn parse_fenced_tool_call(content: &str) -> Option<ToolCall> {
    let (_, _, json) = find_tool_fence(content)?;
    serde_json::from_str::<ToolCall>(json).ok()
}

/// The whole response is a single JSON object with a "tool" key
fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
    let body = content.trim();
    if !(body.starts_with('{') && body.ends_with('}')) {
        return None;
    }

    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    value.get("tool")?;
    serde_json::from_value(value).ok()
}

/// `Action: <tool>` followed by `Action Input: <text>`
fn parse_react_action(content: &str) -> Option<ToolCall> {
    let mut lines = content.lines().map(str::trim);
    let name = lines
        .by_ref()
        .find_map(|line| line.strip_prefix(ACTION))?
        .trim();
    if name.is_empty() || name.eq_ignore_ascii_case("final answer") {
        return None;
    }

    let input = lines.find_map(|line| line.strip_prefix(ACTION_INPUT))?;
    let input = input.trim().trim_matches('"').trim();

    Some(ToolCall::with_arg(name, REACT_INPUT_ARG, input))
}

/// Extract the answer text from a response
pub fn final_answer(content: &str) -> String {
    content
        .rfind(FINAL_ANSWER)
        .map_or(content, |idx| &content[idx + FINAL_ANSWER.len()..])
        .trim()
        .to_string()
}

/// Drop whatever tool request a response carries, keeping any answer text
fn strip_tool_request(content: &str) -> String {
    if parse_inline_tool_call(content).is_some() {
        return String::new();
    }

    let content = match find_tool_fence(content) {
        Some((start, end, _)) => format!("{}{}", &content[..start], &content[end..]),
        None => content.to_string(),
    };

    let kept: Vec<&str> = content
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            !line.starts_with(THOUGHT)
                && !line.starts_with(ACTION)
                && !line.starts_with(ACTION_INPUT)
        })
        .collect();
    final_answer(&kept.join("\n"))
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_tool_calls(mut self, max: usize) -> Self {
        self.config.max_tool_calls = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}
