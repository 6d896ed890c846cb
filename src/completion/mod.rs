pub mod quiz;
pub mod transcript;

pub use quiz::QuizQuestion;

use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CompletionSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("completion response contained no assistant message")]
    Empty,

    #[error("malformed structured response: {0}")]
    Malformed(String),
}

/// One role-tagged message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Client for the text-completion collaborator: an OpenAI-compatible chat
/// endpoint consumed as an opaque request/response service.
pub struct CompletionClient {
    http: Client,
    settings: CompletionSettings,
}

impl CompletionClient {
    pub fn new(settings: CompletionSettings) -> Result<Self, CompletionError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, settings })
    }

    /// Free-form chat: role-tagged messages in, one assistant message out.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.request(messages, CHAT_TEMPERATURE, Some(CHAT_MAX_TOKENS), false)
            .await
    }

    /// Structured call: asks the service for a JSON object response. Callers
    /// still have to parse defensively.
    pub(crate) async fn chat_structured(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, CompletionError> {
        self.request(messages, temperature, None, true).await
    }

    async fn request(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: Option<u32>,
        json_object: bool,
    ) -> Result<String, CompletionError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let body = ChatRequest {
            model: &self.settings.model,
            messages,
            temperature,
            max_tokens,
            response_format: json_object.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        debug!("Sending completion request with {} messages", messages.len());
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::Empty)
    }
}
