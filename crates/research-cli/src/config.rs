//! Startup Configuration
//!
//! Everything is read once, before the shell starts. A missing API key or an
//! unparseable knob is a configuration error and stops the process.

use std::str::FromStr;

use agent_core::{AgentError, GenerationOptions, Result};
use agent_runtime::{ApiKey, GeminiConfig, SearchConfig};

const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Resolved application configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub generation: GenerationOptions,
    pub search: SearchConfig,
}

impl AppConfig {
    /// Read from the process environment (call after loading `.env`)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get(API_KEY_VAR)
            .ok_or_else(|| {
                AgentError::Config(format!(
                    "{API_KEY_VAR} is not set (export it or add it to .env)"
                ))
            })
            .and_then(ApiKey::new)?;

        let defaults = GenerationOptions::default();
        let generation = GenerationOptions {
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            temperature: parse_var(&get, "GEMINI_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_var(&get, "GEMINI_MAX_OUTPUT_TOKENS", defaults.max_tokens)?,
            ..defaults
        };
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(AgentError::Config(format!(
                "GEMINI_TEMPERATURE must be between 0.0 and 2.0, got {}",
                generation.temperature
            )));
        }

        let mut gemini = GeminiConfig::new(api_key)
            .with_model(generation.model.clone())
            .with_timeout(parse_var(&get, "GEMINI_TIMEOUT_SECS", 120_u64)?);
        if let Some(base_url) = get("GEMINI_BASE_URL") {
            gemini = gemini.with_base_url(base_url);
        }

        let search_defaults = SearchConfig::default();
        let search = SearchConfig {
            base_url: get("SEARCH_BASE_URL").unwrap_or(search_defaults.base_url),
            max_results: parse_var(&get, "SEARCH_MAX_RESULTS", search_defaults.max_results)?,
            timeout_secs: parse_var(&get, "SEARCH_TIMEOUT_SECS", search_defaults.timeout_secs)?,
            ..search_defaults
        };
        if !(1..=25).contains(&search.max_results) {
            return Err(AgentError::Config(format!(
                "SEARCH_MAX_RESULTS must be between 1 and 25, got {}",
                search.max_results
            )));
        }

        for (name, value) in [
            ("GEMINI_TIMEOUT_SECS", gemini.timeout_secs),
            ("SEARCH_TIMEOUT_SECS", search.timeout_secs),
            ("GEMINI_MAX_OUTPUT_TOKENS", u64::from(generation.max_tokens)),
        ] {
            if value == 0 {
                return Err(AgentError::Config(format!("{name} must be greater than zero")));
            }
        }

        Ok(Self { gemini, generation, search })
    }
}

fn parse_var<T>(get: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| AgentError::Config(format!("{key}={raw:?} is invalid: {e}")))
    })
}
