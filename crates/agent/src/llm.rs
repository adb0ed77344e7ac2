use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use sfquery_core::config::{LlmConfig, LlmProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm api key is not configured")]
    MissingCredential,
    #[error("llm request timed out")]
    Timeout,
    #[error("llm transport failed: {0}")]
    Transport(String),
    #[error("llm returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm returned no text: {0}")]
    Empty(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider {
        LlmProvider::Gemini => Ok(Arc::new(GeminiClient::new(config)?)),
        LlmProvider::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
    }
}

fn http_client(timeout_secs: u64) -> Result<Client, LlmError> {
    Client::builder().timeout(Duration::from_secs(timeout_secs)).build().map_err(LlmError::from)
}

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or(LlmError::MissingCredential)?;
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature }
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), detail: truncate(&detail) });
        }

        let payload: Value = response.json().await?;
        gemini_text(&payload)
    }
}

/// Joins the text parts of the first candidate in a `generateContent` reply.
pub fn gemini_text(payload: &Value) -> Result<String, LlmError> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(|part| part.get("text")?.as_str()).collect::<String>())
        .unwrap_or_default();

    if !parts.trim().is_empty() {
        return Ok(parts);
    }

    let reason = payload
        .pointer("/promptFeedback/blockReason")
        .or_else(|| payload.pointer("/candidates/0/finishReason"))
        .and_then(Value::as_str)
        .unwrap_or("no candidates");
    Err(LlmError::Empty(reason.to_string()))
}

pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "options": { "temperature": self.temperature }
        });

        let response =
            self.http.post(format!("{}/api/chat", self.base_url)).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), detail: truncate(&detail) });
        }

        let payload: Value = response.json().await?;
        match payload.pointer("/message/content").and_then(Value::as_str) {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(LlmError::Empty("message.content missing".to_string())),
        }
    }
}

/// Pulls a JSON object out of a model reply: a fenced ```json block if
/// present, otherwise the outermost `{ ... }` span.
pub fn extract_json(reply: &str) -> Option<Value> {
    if let Some(start) = reply.find("```") {
        let after_fence = &reply[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            if let Ok(value) = serde_json::from_str::<Value>(body[..end].trim()) {
                return value.is_object().then_some(value);
            }
        }
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&reply[start..=end]).ok().filter(Value::is_object)
}

fn truncate(detail: &str) -> String {
    const LIMIT: usize = 300;
    match detail.char_indices().nth(LIMIT) {
        Some((index, _)) => format!("{}...", &detail[..index]),
        None => detail.to_string(),
    }
}
