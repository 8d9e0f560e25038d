//! The one tool with a genuine external backend: `WebSearch` over HTTP.
//! Gated behind the `real-tools` feature so the crate builds without a
//! network-capable TLS stack by default.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::runtime::errors::{AxonRuntimeError, ErrorContext};

use super::base_tool::{BaseTool, ToolResult};

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    snippet: String,
    url: String,
}

pub struct HttpWebSearch {
    api_key: String,
    client: reqwest::Client,
}

impl HttpWebSearch {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BaseTool for HttpWebSearch {
    fn tool_name_const() -> &'static str { "WebSearch" }
    fn is_stub_const() -> bool { false }
    fn default_timeout_const() -> Duration { Duration::from_secs(10) }

    fn name(&self) -> &'static str {
        Self::tool_name_const()
    }
    fn is_stub(&self) -> bool {
        Self::is_stub_const()
    }
    fn default_timeout(&self) -> Duration {
        Self::default_timeout_const()
    }

    fn validate_config(&self) -> Result<(), AxonRuntimeError> {
        if self.api_key.is_empty() {
            return Err(AxonRuntimeError::validation(
                "WebSearch real backend requires an API key",
                ErrorContext::default(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, query: &str) -> Result<ToolResult, AxonRuntimeError> {
        let response = self
            .client
            .get("https://api.search.invalid/v1/search")
            .bearer_auth(&self.api_key)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| AxonRuntimeError::model_call(e.to_string(), ErrorContext::default()))?;

        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|e| AxonRuntimeError::model_call(e.to_string(), ErrorContext::default()))?;

        Ok(ToolResult::ok(serde_json::json!({
            "results": hits.into_iter().map(|h| serde_json::json!({
                "title": h.title,
                "snippet": h.snippet,
                "url": h.url,
            })).collect::<Vec<_>>(),
        })))
    }
}
