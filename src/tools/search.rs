//! Web 搜索工具：调用 Tavily 兼容的搜索端点
//!
//! POST {endpoint}，请求体带 api_key / query / max_results；把返回的 answer 与各条结果拼成纯文本，
//! 超过 max_result_chars 时截断并追加 ...[truncated]。API Key 取自环境变量 TAVILY_API_KEY。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::SearchSection;
use crate::tools::registry::required_str;
use crate::tools::{Tool, ToolError, WEB_SEARCH};
use crate::workflow::StepParams;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Web 搜索工具
pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: usize,
    max_result_chars: usize,
}

impl WebSearchTool {
    pub fn new(cfg: &SearchSection, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key,
            max_results: cfg.max_results,
            max_result_chars: cfg.max_result_chars,
        }
    }

    /// 从环境变量 TAVILY_API_KEY 读取 Key
    pub fn from_env(cfg: &SearchSection) -> Self {
        Self::new(cfg, std::env::var("TAVILY_API_KEY").ok())
    }
}

fn render_response(resp: &SearchResponse) -> String {
    let mut parts = Vec::new();
    if let Some(answer) = resp.answer.as_deref().filter(|a| !a.trim().is_empty()) {
        parts.push(format!("Answer: {}", answer.trim()));
    }
    for (i, hit) in resp.results.iter().enumerate() {
        parts.push(format!(
            "[{}] {}\n{}\n{}",
            i + 1,
            hit.title.trim(),
            hit.url.trim(),
            hit.content.trim()
        ));
    }
    if parts.is_empty() {
        "No results found.".to_string()
    } else {
        parts.join("\n\n")
    }
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("\n...[truncated]");
    out
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH
    }

    fn description(&self) -> &str {
        "Search the web for current information. Args: {\"query\": \"...\"}"
    }

    async fn execute(&self, args: &StepParams) -> Result<String, ToolError> {
        let query = required_str(args, "query")?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::Failed("TAVILY_API_KEY is not set".to_string()))?;

        tracing::info!(query = %query, "web search");
        let body = serde_json::json!({
            "api_key": api_key,
            "query": query,
            "max_results": self.max_results,
            "include_answer": true,
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(ToolError::Failed(format!("HTTP {}", resp.status())));
        }
        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ToolError::Failed(format!("Invalid search response: {e}")))?;

        Ok(truncate_chars(render_response(&parsed), self.max_result_chars))
    }
}
