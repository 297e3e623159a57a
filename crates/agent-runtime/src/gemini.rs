//! Gemini LLM Provider
//!
//! Implementation of `LlmProvider` for Google's hosted Gemini models via the
//! `generateContent` REST endpoint.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, DEFAULT_MODEL, FinishReason, GenerationOptions, LlmProvider, TokenUsage,
    },
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Public Gemini endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API key, redacted from debug output
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank values
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(AgentError::Config("GEMINI_API_KEY is empty".into()));
        }
        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// Credential sent with every request
    pub api_key: ApiKey,

    /// API base URL, without trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Model the health check looks up
    pub model: String,
}

impl GeminiConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
            model: DEFAULT_MODEL.into(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Gemini LLM provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create from configuration
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// `models/<id>`, accepting ids that already carry the prefix
    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }

    fn endpoint(&self, model: &str, action: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/{}:{action}", Self::model_path(model))
    }

    /// Convert agent messages to Gemini contents.
    ///
    /// System turns go to the system instruction. Consecutive turns that map
    /// to the same Gemini role are merged into one content.
    fn convert_messages(messages: &[Message]) -> (Option<Content>, Vec<Content>) {
        let mut system_parts = Vec::new();
        let mut contents: Vec<Content> = Vec::new();

        for m in messages {
            let (role, text) = match m.role {
                Role::System => {
                    system_parts.push(Part { text: m.content.clone() });
                    continue;
                }
                Role::User => ("user", m.content.clone()),
                Role::Assistant => ("model", m.content.clone()),
                // Tools appear as user context
                Role::Tool => (
                    "user",
                    format!(
                        "[Tool '{}' returned]\n{}",
                        m.name.as_deref().unwrap_or("tool"),
                        m.content
                    ),
                ),
            };

            match contents.last_mut() {
                Some(last) if last.role == Some(role) => last.parts.push(Part { text }),
                _ => contents.push(Content {
                    role: Some(role),
                    parts: vec![Part { text }],
                }),
            }
        }

        let system = (!system_parts.is_empty()).then_some(Content {
            role: None,
            parts: system_parts,
        });

        (system, contents)
    }

    fn build_request(messages: &[Message], opts: &GenerationOptions) -> GenerateContentRequest {
        let (system_instruction, contents) = Self::convert_messages(messages);

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: opts.temperature,
                top_p: opts.top_p,
                max_output_tokens: opts.max_tokens,
                stop_sequences: opts.stop_sequences.clone(),
            },
        }
    }

    /// Convert a Gemini response to an agent completion
    fn convert_completion(response: GenerateContentResponse, model: &str) -> Result<Completion> {
        let usage = response.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map_or_else(
                    || "no candidates returned".to_string(),
                    |r| format!("prompt blocked ({r})"),
                );
            return Err(AgentError::InvalidResponse(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
            return Err(AgentError::InvalidResponse(format!(
                "empty response (finish reason: {reason})"
            )));
        }

        Ok(Completion {
            content: text,
            model: model.to_string(),
            usage,
            finish_reason: candidate.finish_reason.as_deref().map(map_finish_reason),
        })
    }
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Map a non-success HTTP answer to an agent error
fn status_error(status: StatusCode, body: &str) -> AgentError {
    let api = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = api
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"));
    let api_status = api.as_ref().map_or("", |e| e.status.as_str());

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || matches!(api_status, "UNAUTHENTICATED" | "PERMISSION_DENIED")
        || message.contains("API key")
    {
        AgentError::Auth(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        AgentError::RateLimited(message)
    } else if status.is_server_error() {
        AgentError::ProviderUnavailable(message)
    } else {
        AgentError::Provider(format!("{status}: {message}"))
    }
}

fn transport_error(err: &reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = format!("{base}/{}", Self::model_path(&self.config.model));
        match self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.config.api_key.expose())
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    model = %self.config.model,
                    "Gemini health check rejected"
                );
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = Self::build_request(messages, options);
        let url = self.endpoint(&options.model, "generateContent");

        tracing::debug!(
            model = %options.model,
            contents = request.contents.len(),
            "Sending Gemini request"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.config.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(&e))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::InvalidResponse(format!("undecodable body: {e}")))?;

        Self::convert_completion(parsed, &options.model)
    }
}
