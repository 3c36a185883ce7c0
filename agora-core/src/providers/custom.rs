use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AgoraError, AgoraResult};

use super::{ChatCompletion, ChatMessage, ProviderConfig, TokenUsage};

const DEFAULT_MODEL: &str = "default";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

/// Custom endpoints are expected to be OpenAI-compatible, but some return
/// the completion as a top-level `content` field; both shapes are accepted.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    content: Option<String>,
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

pub(super) async fn chat(
    http: &Client,
    messages: &[ChatMessage],
    config: &ProviderConfig,
) -> AgoraResult<ChatCompletion> {
    let base_url = config
        .base_url
        .as_deref()
        .ok_or_else(|| AgoraError::MissingBaseUrl("custom".to_string()))?;
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    debug!(model, base_url, "Sending custom endpoint chat request");

    let mut request = http
        .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
        .header("Content-Type", "application/json")
        .json(&ChatRequest { model, messages });

    if let Some(api_key) = config.api_key.as_deref() {
        request = request.header("Authorization", format!("Bearer {}", api_key));
    }

    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgoraError::ProviderStatus {
            provider: "custom".to_string(),
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
        .or(data.content)
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
