//! Minimal Ollama chat client

use duet_application::GenerationError;
use duet_domain::SamplingParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<SamplingParams>,
}

#[derive(Deserialize, Default)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    messages: Vec<ResponseMessage>,
}

impl ChatResponse {
    /// `message.content`, else the last entry of `messages`, else empty.
    fn into_text(self) -> String {
        self.message
            .or_else(|| self.messages.into_iter().last())
            .unwrap_or_default()
            .content
            .trim()
            .to_string()
    }
}

fn map_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else if e.is_connect() {
        GenerationError::Connection(e.to_string())
    } else if e.is_decode() {
        GenerationError::InvalidResponse(e.to_string())
    } else {
        GenerationError::Other(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Other(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one non-streaming chat request and return the reply text.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        options: Option<SamplingParams>,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/chat", self.base_url);
        debug!(url = %url, messages = messages.len(), "Ollama chat request");

        let response = self
            .http
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                stream: false,
                options,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(map_transport_error)?;
        Ok(parsed.into_text())
    }
}
