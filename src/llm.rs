// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon OpenAI-Compatible Client
 * Chat-completions wrapper with tolerant JSON reply extraction
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::RuntimeConfig;
use crate::errors::LlmError;

const DEFAULT_TIMEOUT_SECS: u64 = 20;

static FENCED_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:json)?\s*([\s\S]*?)```").unwrap());
static CHAT_COMPLETIONS_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/chat/completions/?$").unwrap());

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Resolve the chat-completions endpoint from a configured base URL.
/// Idempotent: a base that already ends in `/chat/completions` is kept.
pub fn build_chat_completions_url(base_url: &str) -> Option<String> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return None;
    }

    if CHAT_COMPLETIONS_SUFFIX_RE.is_match(trimmed) {
        return Some(trimmed.trim_end_matches('/').to_string());
    }

    let normalized = format!("{}/", trimmed.trim_end_matches('/'));
    Url::parse(&normalized)
        .and_then(|base| base.join("chat/completions"))
        .ok()
        .map(|url| url.to_string())
}

/// Assistant text of the first choice: plain string content, content-part
/// arrays, or the legacy `text` field.
fn extract_assistant_text(response: &Value) -> String {
    let Some(choice) = response["choices"].get(0) else {
        return String::new();
    };

    if let Some(content) = choice["message"]["content"].as_str() {
        return content.to_string();
    }

    if let Some(parts) = choice["message"]["content"].as_array() {
        return parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n");
    }

    choice["text"].as_str().unwrap_or("").to_string()
}

/// Parse structured data out of a free-form assistant reply: direct JSON,
/// then a fenced code block, then the substring between the first `{` and
/// the last `}`. First successful parse wins.
pub fn try_parse_json(text: &str) -> Option<Value> {
    let direct = text.trim();
    if direct.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(direct) {
        return Some(value);
    }

    if let Some(caps) = FENCED_JSON_RE.captures(direct) {
        if let Ok(value) = serde_json::from_str(caps[1].trim()) {
            return Some(value);
        }
    }

    let start = direct.find('{')?;
    let end = direct.rfind('}')?;
    if end > start {
        return serde_json::from_str(&direct[start..=end]).ok();
    }

    None
}

/// Thin request/response wrapper for an OpenAI-compatible endpoint.
/// One chat-completion request per call, temperature pinned to 0.
pub struct OpenAiCompatClient {
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for LLM requests")?;
        Ok(Self { client })
    }

    /// Send a chat request and parse JSON out of the assistant reply.
    pub async fn request_json(
        &self,
        config: &RuntimeConfig,
        messages: &[ChatMessage],
    ) -> Result<Value, LlmError> {
        if !config.is_complete() {
            return Err(LlmError::MissingConfig);
        }

        let url = build_chat_completions_url(&config.base_url).ok_or(LlmError::InvalidBaseUrl)?;
        debug!("LLM request to {} with model {}", url, config.model);

        let body = serde_json::json!({
            "model": config.model,
            "messages": messages,
            "temperature": 0,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&config.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Http(status.as_u16()));
        }

        let parsed: Value =
            serde_json::from_str(&raw).map_err(|_| LlmError::InvalidJsonResponse)?;

        let content = extract_assistant_text(&parsed);
        try_parse_json(&content).ok_or(LlmError::InvalidJsonContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_appends_path_once() {
        assert_eq!(
            build_chat_completions_url("https://llm.example/v1").as_deref(),
            Some("https://llm.example/v1/chat/completions")
        );
        assert_eq!(
            build_chat_completions_url("https://llm.example/v1/").as_deref(),
            Some("https://llm.example/v1/chat/completions")
        );
        assert_eq!(
            build_chat_completions_url("https://llm.example/v1/chat/completions").as_deref(),
            Some("https://llm.example/v1/chat/completions")
        );
        assert_eq!(
            build_chat_completions_url("https://llm.example/v1/chat/completions/").as_deref(),
            Some("https://llm.example/v1/chat/completions")
        );
        assert_eq!(build_chat_completions_url(""), None);
    }

    #[test]
    fn parses_plain_fenced_and_embedded_json() {
        let plain = r#"{"strategies": []}"#;
        assert!(try_parse_json(plain).is_some());

        let fenced = "Here you go:\n```json\n{\"strategies\": []}\n```";
        assert_eq!(try_parse_json(fenced).unwrap()["strategies"], serde_json::json!([]));

        let embedded = "The answer is {\"strategies\": [{\"endpoint\": \"/api\"}]} as requested.";
        let parsed = try_parse_json(embedded).unwrap();
        assert_eq!(parsed["strategies"][0]["endpoint"], "/api");

        assert!(try_parse_json("no json here").is_none());
        assert!(try_parse_json("").is_none());
    }

    #[test]
    fn assistant_text_handles_string_and_part_arrays() {
        let string_content = serde_json::json!({
            "choices": [{"message": {"content": "hello"}}]
        });
        assert_eq!(extract_assistant_text(&string_content), "hello");

        let part_content = serde_json::json!({
            "choices": [{"message": {"content": [{"type": "text", "text": "a"}, {"text": "b"}]}}]
        });
        assert_eq!(extract_assistant_text(&part_content), "a\nb");

        let legacy = serde_json::json!({"choices": [{"text": "legacy"}]});
        assert_eq!(extract_assistant_text(&legacy), "legacy");

        assert_eq!(extract_assistant_text(&serde_json::json!({})), "");
    }
}
