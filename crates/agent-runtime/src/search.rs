//! Web Search Tool
//!
//! DuckDuckGo HTML search. Returns a short plain-text digest of the top hits;
//! a search with no hits yields an empty string rather than an error.

use std::fmt::Write as _;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema},
};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;

/// DuckDuckGo's no-JavaScript results page
pub const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

const TOOL_NAME: &str = "web_search";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Search tool configuration
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Results page URL; the query is sent as `q`
    pub base_url: String,

    /// Maximum hits included in the digest
    pub max_results: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_URL.into(),
            max_results: 5,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

/// One search hit
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Tool for searching the web
pub struct WebSearchTool {
    client: Client,
    config: SearchConfig,
}

impl WebSearchTool {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Run a search and return the parsed hits
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        tracing::debug!(query, "Sending search request to DuckDuckGo");

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| AgentError::ToolExecution(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "Search returned error status");
            return Err(AgentError::ToolExecution(format!("search failed with status {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AgentError::ToolExecution(format!("failed to read search results: {e}")))?;

        parse_results(&html, self.config.max_results)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: TOOL_NAME.into(),
            description: "Search the web with DuckDuckGo. Use it for current events, facts you are unsure of, \
                          or anything that needs an up-to-date source. Returns titles, snippets and URLs."
                .into(),
            parameters: vec![ParameterSchema {
                name: "query".into(),
                param_type: "string".into(),
                description: "The search query".into(),
                required: true,
            }],
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let query = call
            .str_arg("query")
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AgentError::ToolValidation("query must be a non-empty string".into()))?;

        let hits = self.search(query).await?;
        tracing::debug!(query, hits = hits.len(), "Search finished");

        let data = serde_json::to_value(&hits)?;
        Ok(ToolResult::success(TOOL_NAME, format_digest(&hits)).with_data(data))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| AgentError::ToolExecution(format!("bad selector {css}: {e:?}")))
}

fn element_text(el: scraper::ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// DuckDuckGo wraps result links in a redirect carrying the target as `uddg`
fn unwrap_redirect(href: &str) -> String {
    href.split("uddg=")
        .nth(1)
        .map(|rest| rest.split('&').next().unwrap_or(rest))
        .and_then(|encoded| urlencoding::decode(encoded).ok())
        .map_or_else(|| href.to_string(), std::borrow::Cow::into_owned)
}

/// Parse hits out of a DuckDuckGo HTML results page
pub fn parse_results(html: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let document = Html::parse_document(html);
    let result_selector = selector(".result")?;
    let title_selector = selector(".result__a")?;
    let snippet_selector = selector(".result__snippet")?;

    let mut hits = Vec::new();

    for result_el in document.select(&result_selector) {
        if hits.len() >= limit {
            break;
        }

        let Some(link) = result_el.select(&title_selector).next() else {
            continue;
        };

        let title = element_text(link);
        let url = link.value().attr("href").map(unwrap_redirect).unwrap_or_default();
        let snippet = result_el
            .select(&snippet_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();

        if !title.is_empty() && !url.is_empty() {
            hits.push(SearchHit { title, url, snippet });
        }
    }

    Ok(hits)
}

/// Plain-text digest handed to the model; empty when there are no hits
pub fn format_digest(hits: &[SearchHit]) -> String {
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}. {}", i + 1, hit.title);
        if !hit.snippet.is_empty() {
            let _ = writeln!(out, "   {}", hit.snippet);
        }
        let _ = writeln!(out, "   {}", hit.url);
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_PAGE: &str = r##"<html><body>
        <div class="result results_links">
          <h2 class="result__title">
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust Programming Language</a>
          </h2>
          <a class="result__snippet" href="#">A language empowering everyone to build
             reliable and efficient software.</a>
        </div>
        <div class="result results_links">
          <h2 class="result__title">
            <a class="result__a" href="https://doc.rust-lang.org/book/">The Rust <b>Book</b></a>
          </h2>
        </div>
        <div class="result results_links">
          <a class="result__a" href="https://crates.io/">crates.io</a>
          <a class="result__snippet">The Rust community's crate registry</a>
        </div>
    </body></html>"##;

    fn tool_for(server: &MockServer) -> WebSearchTool {
        WebSearchTool::new(SearchConfig {
            base_url: format!("{}/html/", server.uri()),
            ..SearchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_results() {
        let hits = parse_results(RESULTS_PAGE, 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Rust Programming Language");
        assert_eq!(hits[0].url, "https://www.rust-lang.org/");
        assert_eq!(
            hits[0].snippet,
            "A language empowering everyone to build reliable and efficient software."
        );
        assert_eq!(hits[1].title, "The Rust Book");
        assert!(hits[1].snippet.is_empty());
    }

    #[test]
    fn test_parse_respects_limit() {
        assert_eq!(parse_results(RESULTS_PAGE, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_empty_results() {
        let hits = parse_results("<html><body></body></html>", 10).unwrap();
        assert!(hits.is_empty());
        assert_eq!(format_digest(&hits), "");
    }

    #[test]
    fn test_digest_format() {
        let hits = vec![
            SearchHit {
                title: "Paris".into(),
                url: "https://en.wikipedia.org/wiki/Paris".into(),
                snippet: "Capital of France.".into(),
            },
            SearchHit {
                title: "Lyon".into(),
                url: "https://en.wikipedia.org/wiki/Lyon".into(),
                snippet: String::new(),
            },
        ];

        assert_eq!(
            format_digest(&hits),
            "1. Paris\n   Capital of France.\n   https://en.wikipedia.org/wiki/Paris\n\n\
             2. Lyon\n   https://en.wikipedia.org/wiki/Lyon"
        );
    }

    #[test]
    fn test_unwrap_redirect() {
        assert_eq!(
            unwrap_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&rut=x"),
            "https://example.com/a?b=1"
        );
        assert_eq!(unwrap_redirect("https://example.com/"), "https://example.com/");
    }

    #[tokio::test]
    async fn test_execute_returns_digest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "rust language"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let result = tool_for(&server)
            .execute(&ToolCall::with_arg("web_search", "query", "  rust language "))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.starts_with("1. Rust Programming Language\n"));
        assert_eq!(result.data.unwrap().as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_execute_no_hits_is_empty_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>No results.</body></html>"),
            )
            .mount(&server)
            .await;

        let result = tool_for(&server)
            .execute(&ToolCall::with_arg("web_search", "query", "zzqxq"))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, "");
    }

    #[tokio::test]
    async fn test_execute_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = tool_for(&server)
            .execute(&ToolCall::with_arg("web_search", "query", "rust"))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ToolExecution(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_execute_rejects_blank_query() {
        let tool = WebSearchTool::new(SearchConfig::default()).unwrap();
        let err = tool
            .execute(&ToolCall::with_arg("web_search", "query", "   "))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ToolValidation(_)));
    }
}
