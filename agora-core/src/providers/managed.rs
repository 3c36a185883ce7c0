use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AgoraError, AgoraResult};

use super::{ChatCompletion, ChatMessage, TokenUsage};

/// The built-in, credential-free backend behind [`ProviderKind::Managed`].
///
/// The hosting platform decides what actually serves these completions;
/// tests inject scripted implementations through this seam.
///
/// [`ProviderKind::Managed`]: super::ProviderKind::Managed
#[async_trait]
pub trait ManagedBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> AgoraResult<ChatCompletion>;
}

/// Managed backend speaking the OpenAI-compatible chat-completions shape
/// against a fixed base URL, with no auth header.
pub struct HttpManagedBackend {
    http: Client,
    base_url: String,
    model: String,
}

impl HttpManagedBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            model: "default".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl ManagedBackend for HttpManagedBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> AgoraResult<ChatCompletion> {
        debug!(base_url = %self.base_url, "Sending managed backend request");

        let response = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "messages": messages,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgoraError::ProviderStatus {
                provider: "managed".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let data: ChatResponse = response.json().await?;

        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        Ok(ChatCompletion {
            content,
            usage: data.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}
