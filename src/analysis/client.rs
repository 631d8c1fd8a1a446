//! Chat-completion client
//!
//! Thin async wrapper around an OpenAI-compatible `/chat/completions`
//! endpoint. Anything that can answer a system+user prompt pair implements
//! [`AnalysisProvider`], so the analysis path can be exercised without a
//! network.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::AnalysisError;
use crate::config::AiSettings;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2000;

/// Source of free-text completions
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AnalysisError>;
}

/// Production provider backed by the OpenAI chat API
pub struct OpenAiClient {
    http: reqwest::Client,
    settings: AiSettings,
}

impl OpenAiClient {
    pub fn new(settings: AiSettings) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { http, settings })
    }

    pub fn has_api_key(&self) -> bool {
        self.settings.api_key.is_some()
    }
}

#[async_trait]
impl AnalysisProvider for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AnalysisError> {
        let key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(AnalysisError::MissingApiKey)?;

        let body = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        tracing::debug!(model = %self.settings.model, endpoint = %self.settings.endpoint, "Requesting analysis");

        let resp = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let chat: Value = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::MalformedResponse(format!("response JSON: {}", e)))?;

        message_content(&chat)
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::MalformedResponse("no content in API response".to_string()))
    }
}

/// `choices[0].message.content` of a chat completion
fn message_content(chat: &Value) -> Option<&str> {
    chat.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
}
