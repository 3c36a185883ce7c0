use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AgoraError, AgoraResult};

use super::{ChatCompletion, ChatMessage, ProviderConfig, Role, TokenUsage};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const MAX_TOKENS: u32 = 4096;

/// The Anthropic messages API takes the system instruction in a dedicated
/// top-level field and requires `max_tokens`; the messages list carries only
/// user/assistant turns.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

pub(super) async fn chat(
    http: &Client,
    messages: &[ChatMessage],
    config: &ProviderConfig,
) -> AgoraResult<ChatCompletion> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| AgoraError::MissingApiKey("anthropic".to_string()))?;

    let base_url = config.base_url.as_deref().unwrap_or(ANTHROPIC_API_BASE);
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str());
    let conversation: Vec<WireMessage<'_>> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| WireMessage {
            role: if m.role == Role::Assistant {
                "assistant"
            } else {
                "user"
            },
            content: &m.content,
        })
        .collect();

    debug!(model, "Sending Anthropic messages request");

    let response = http
        .post(format!("{}/messages", base_url.trim_end_matches('/')))
        .header("Content-Type", "application/json")
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_API_VERSION)
        .json(&MessagesRequest {
            model,
            max_tokens: MAX_TOKENS,
            system,
            messages: conversation,
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgoraError::ProviderStatus {
            provider: "anthropic".to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let data: MessagesResponse = response.json().await?;

    let content = data
        .content
        .into_iter()
        .next()
        .and_then(|b| b.text)
        .unwrap_or_default();

    Ok(ChatCompletion {
        content,
        usage: data.usage.map(|u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        }),
    })
}
