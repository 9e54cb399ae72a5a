//! LLM client for OpenAI-compatible chat-completion endpoints (Gemini by default)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::ContentConfig;

pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Anything that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ============ Provider Configuration ============

/// Configuration for an LLM API provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL for the API, without the `/chat/completions` suffix
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
}

impl ProviderConfig {
    /// Google's OpenAI-compatible Gemini endpoint
    pub fn gemini(api_key: String) -> Self {
        Self {
            base_url: GEMINI_OPENAI_BASE_URL.to_string(),
            api_key,
        }
    }

    /// Any other OpenAI-compatible endpoint
    pub fn custom(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Provider for a configured base URL
    pub fn for_base_url(api_key: String, base_url: &str) -> Self {
        if base_url.trim_end_matches('/') == GEMINI_OPENAI_BASE_URL {
            Self::gemini(api_key)
        } else {
            Self::custom(api_key, base_url)
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completion client bound to one model
#[derive(Clone)]
pub struct LlmClient {
    client: Arc<Client>,
    provider: ProviderConfig,
    model: String,
    max_tokens: Option<u32>,
}

impl LlmClient {
    /// Create a client with an explicit provider and model
    pub fn new(provider: ProviderConfig, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            provider,
            model: model.into(),
            max_tokens: None,
        })
    }

    /// Create a client from the `[content]` config section
    pub fn from_config(config: &ContentConfig, api_key: String) -> Result<Self> {
        let provider = ProviderConfig::for_base_url(api_key, &config.base_url);
        let mut client = Self::new(provider, config.model.clone(), Duration::from_secs(config.timeout_secs))?;
        client.max_tokens = config.max_tokens;
        Ok(client)
    }

    /// Send a chat completion request and return the assistant text
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .header("Authorization", format!("Bearer {}", self.provider.api_key))
            .json(&request)
            .send()
            .await
            .context("Failed to send request to LLM provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("LLM API error ({}): {}", status, body);
        }

        let body = response.text().await.context("Failed to read response body")?;
        debug!("LLM response: {} bytes", body.len());

        let raw_response: serde_json::Value = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse JSON response (body: {})", truncate(&body, 500)))?;

        let content = extract_content(&raw_response);
        if content.trim().is_empty() {
            bail!("LLM returned no content");
        }
        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(vec![ChatMessage::user(prompt)]).await
    }
}

/// Pull the first choice's text out of a chat-completion response.
/// Handles both string content and array-of-content-parts.
fn extract_content(response: &serde_json::Value) -> String {
    let content_value = response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"));

    match content_value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| {
                if part.get("type").and_then(|t| t.as_str()) == Some("text") {
                    part.get("text").and_then(|t| t.as_str()).map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content_string() {
        let response = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "# Roles"}}]
        });
        assert_eq!(extract_content(&response), "# Roles");
    }

    #[test]
    fn test_extract_content_parts() {
        let response = serde_json::json!({
            "choices": [{"message": {"content": [
                {"type": "text", "text": "Hello "},
                {"type": "image_url", "image_url": {"url": "x"}},
                {"type": "text", "text": "world"}
            ]}}]
        });
        assert_eq!(extract_content(&response), "Hello world");
    }

    #[test]
    fn test_extract_content_missing() {
        assert_eq!(extract_content(&serde_json::json!({"choices": []})), "");
    }

    #[test]
    fn test_custom_provider_trims_slash() {
        let provider = ProviderConfig::custom("k".to_string(), "http://localhost:8000/v1/");
        assert_eq!(provider.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn test_from_config_picks_provider() {
        let mut config = ContentConfig::default();
        let client = LlmClient::from_config(&config, "k".to_string()).unwrap();
        assert_eq!(client.provider.base_url, GEMINI_OPENAI_BASE_URL);
        assert_eq!(client.model, "gemini-1.5-flash");

        config.base_url = "http://localhost:11434/v1/".to_string();
        config.max_tokens = Some(512);
        let client = LlmClient::from_config(&config, "k".to_string()).unwrap();
        assert_eq!(client.provider.base_url, "http://localhost:11434/v1");
        assert_eq!(client.max_tokens, Some(512));
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gemini-1.5-flash".to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gemini-1.5-flash");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("ñandú", 2), "ña");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
