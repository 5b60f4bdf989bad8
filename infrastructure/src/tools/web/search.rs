//! `web_search` tool — ranked web results from a pluggable search backend.
//!
//! # Parameters
//!
//! | Name | Type | Required | Description |
//! |------|------|:---:|-------------|
//! | `query` | string | Yes | The search query |
//! | `max_results` | integer | No | 1..=10, default from settings (5) |
//!
//! # Payload
//!
//! ```json
//! { "query": "...", "results": [{ "title", "snippet", "url" }], "count": 3 }
//! ```
//!
//! Results keep the backend's ranking order. Upstream failures surface as
//! [`ToolError::Provider`]; a request that outlives the configured wait is a
//! [`ToolError::Timeout`].

use std::sync::Arc;

use agentic_domain::{
    ParamType, SandboxPolicy, ToolCall, ToolError, ToolKind, ToolParameter, ToolSpec, names,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::sandbox::SandboxExecutor;
use crate::tools::settings::{NETWORK, WebSearchSettings};

const MAX_RESULTS_CEILING: usize = 10;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Source of ranked search results.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError>;
}

/// Backend used when no HTTP client is compiled in.
#[derive(Debug, Clone, Default)]
pub struct UnavailableBackend;

#[async_trait]
impl SearchBackend for UnavailableBackend {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        Err(ToolError::Provider(
            "web search is not available in this build (enable the web-tools feature)".to_string(),
        ))
    }
}

/// SerpAPI (Google engine) backend.
#[cfg(feature = "web-tools")]
#[derive(Debug, Clone)]
pub struct SerpApiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: std::time::Duration,
}

#[cfg(feature = "web-tools")]
impl SerpApiBackend {
    pub fn new(settings: &WebSearchSettings) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("agentic/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::Provider(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            timeout: settings.timeout,
        })
    }
}

#[cfg(feature = "web-tools")]
#[async_trait]
impl SearchBackend for SerpApiBackend {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ToolError::Provider("no SerpAPI key configured".to_string()));
        };

        let num = max_results.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", api_key),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout {
                        after_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    ToolError::Provider(format!("search request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Provider(format!(
                "search API returned {}: {}",
                status,
                agentic_domain::core::string::truncate(&body, 200)
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::Provider(format!("failed to parse search results: {}", e)))?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(ToolError::Provider(error.to_string()));
        }

        Ok(parse_organic_results(&body, max_results))
    }
}

/// Extract `organic_results` from a SerpAPI response, keeping rank order.
#[cfg_attr(not(feature = "web-tools"), allow(dead_code))]
pub(crate) fn parse_organic_results(data: &Value, max_results: usize) -> Vec<SearchHit> {
    let field = |item: &Value, key: &str| item[key].as_str().unwrap_or_default().to_string();
    data["organic_results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(max_results)
                .map(|item| SearchHit {
                    title: field(item, "title"),
                    snippet: field(item, "snippet"),
                    url: field(item, "link"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The `web_search` adapter.
#[derive(Clone)]
pub struct WebSearchTool {
    backend: Arc<dyn SearchBackend>,
    default_max_results: usize,
    policy: SandboxPolicy,
}

impl WebSearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>, settings: &WebSearchSettings, policy: SandboxPolicy) -> Self {
        Self {
            backend,
            default_max_results: settings.max_results.clamp(1, MAX_RESULTS_CEILING),
            policy,
        }
    }

    /// Adapter with the backend selected by the compiled features.
    pub fn from_settings(settings: &WebSearchSettings, policy: SandboxPolicy) -> Result<Self, ToolError> {
        #[cfg(feature = "web-tools")]
        let backend: Arc<dyn SearchBackend> = Arc::new(SerpApiBackend::new(settings)?);
        #[cfg(not(feature = "web-tools"))]
        let backend: Arc<dyn SearchBackend> = Arc::new(UnavailableBackend);
        Ok(Self::new(backend, settings, policy))
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            names::WEB_SEARCH,
            "Search the web. Returns ranked results with title, snippet and url.",
            ToolKind::WebSearch,
        )
        .with_parameter(ToolParameter::new("query", "The search query", ParamType::String, true))
        .with_parameter(
            ToolParameter::new(
                "max_results",
                "Number of results to return",
                ParamType::Integer,
                false,
            )
            .with_default(self.default_max_results as i64)
            .with_range(Some(1.0), Some(MAX_RESULTS_CEILING as f64)),
        )
    }

    pub async fn execute(&self, call: &ToolCall, sandbox: &SandboxExecutor) -> Result<Value, ToolError> {
        let query = call
            .get_string("query")
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::validation(names::WEB_SEARCH, "query must not be empty"))?;
        let max_results = call
            .get_i64("max_results")
            .map(|n| n.clamp(1, MAX_RESULTS_CEILING as i64) as usize)
            .unwrap_or(self.default_max_results);

        sandbox
            .run_in_process(&[NETWORK], &self.policy, async {
                let mut hits = self.backend.search(query, max_results).await?;
                hits.truncate(max_results);
                Ok(json!({
                    "query": query,
                    "count": hits.len(),
                    "results": hits,
                }))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_domain::CallId;
    use std::time::Duration;

    /// Backend returning `available` numbered hits after an optional delay.
    struct FixtureBackend {
        available: usize,
        delay: Duration,
    }

    #[async_trait]
    impl SearchBackend for FixtureBackend {
        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
            tokio::time::sleep(self.delay).await;
            Ok((0..self.available.min(max_results + 3))
                .map(|i| SearchHit {
                    title: format!("{} #{}", query, i),
                    snippet: format!("snippet {}", i),
                    url: format!("https://example.com/{}", i),
                })
                .collect())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl SearchBackend for FailingBackend {
        async fn search(&self, _: &str, _: usize) -> Result<Vec<SearchHit>, ToolError> {
            Err(ToolError::Provider("API error: 401".into()))
        }
    }

    fn tool(backend: Arc<dyn SearchBackend>, timeout: Duration) -> WebSearchTool {
        let settings = WebSearchSettings {
            timeout,
            ..Default::default()
        };
        let policy = SandboxPolicy::new(timeout, 64).with_allowed([NETWORK]);
        WebSearchTool::new(backend, &settings, policy)
    }

    fn call(query: &str) -> ToolCall {
        ToolCall::new(CallId::new("c1"), names::WEB_SEARCH).with_arg("query", query)
    }

    #[tokio::test]
    async fn test_results_bounded_and_ordered() {
        let backend = Arc::new(FixtureBackend {
            available: 20,
            delay: Duration::ZERO,
        });
        let tool = tool(backend, Duration::from_secs(1));
        let payload = tool
            .execute(&call("X").with_arg("max_results", 5), &SandboxExecutor::new())
            .await
            .unwrap();

        let results = payload["results"].as_array().unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(payload["count"], 5);
        assert_eq!(results[0]["title"], "X #0");
        assert_eq!(results[4]["url"], "https://example.com/4");
    }

    #[tokio::test]
    async fn test_default_max_results() {
        let backend = Arc::new(FixtureBackend {
            available: 20,
            delay: Duration::ZERO,
        });
        let tool = tool(backend, Duration::from_secs(1));
        let payload = tool.execute(&call("rust"), &SandboxExecutor::new()).await.unwrap();
        assert_eq!(payload["count"], 5);
    }

    #[tokio::test]
    async fn test_provider_error() {
        let tool = tool(Arc::new(FailingBackend), Duration::from_secs(1));
        let err = tool.execute(&call("x"), &SandboxExecutor::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Provider(_)));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let backend = Arc::new(FixtureBackend {
            available: 1,
            delay: Duration::from_secs(5),
        });
        let tool = tool(backend, Duration::from_millis(50));
        let err = tool.execute(&call("x"), &SandboxExecutor::new()).await.unwrap_err();
        assert_eq!(err, ToolError::Timeout { after_ms: 50 });
    }

    #[tokio::test]
    async fn test_network_denied_by_policy() {
        let backend = Arc::new(FixtureBackend {
            available: 1,
            delay: Duration::ZERO,
        });
        let settings = WebSearchSettings::default();
        let policy = SandboxPolicy::new(Duration::from_secs(1), 64);
        let tool = WebSearchTool::new(backend, &settings, policy);
        let err = tool.execute(&call("x"), &SandboxExecutor::new()).await.unwrap_err();
        assert_eq!(err, ToolError::CapabilityDenied(NETWORK.to_string()));
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let tool = tool(Arc::new(UnavailableBackend), Duration::from_secs(1));
        let err = tool.execute(&call("x"), &SandboxExecutor::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Provider(msg) if msg.contains("web-tools")));
    }

    #[test]
    fn test_spec_parameters() {
        let tool = tool(Arc::new(UnavailableBackend), Duration::from_secs(1));
        let spec = tool.spec();
        assert_eq!(spec.name, "web_search");
        assert!(spec.side_effect.is_read_only());
        let max = spec.parameter("max_results").unwrap();
        assert_eq!(max.default, Some(json!(5)));
        assert_eq!(max.maximum, Some(10.0));
    }

    #[test]
    fn test_parse_organic_results() {
        let data = json!({
            "organic_results": [
                {"title": "A", "link": "https://a", "snippet": "first"},
                {"title": "B", "link": "https://b"},
                {"title": "C", "link": "https://c", "snippet": "third"}
            ]
        });
        let hits = parse_organic_results(&data, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a");
        assert_eq!(hits[1].snippet, "");
        assert!(parse_organic_results(&json!({}), 5).is_empty());
    }
}
