use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AgoraError, AgoraResult};

use super::{ChatCompletion, ChatMessage, ProviderConfig, TokenUsage};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
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

pub(super) async fn chat(
    http: &Client,
    messages: &[ChatMessage],
    config: &ProviderConfig,
) -> AgoraResult<ChatCompletion> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| AgoraError::MissingApiKey("openai".to_string()))?;

    let base_url = config.base_url.as_deref().unwrap_or(OPENAI_API_BASE);
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    debug!(model, "Sending OpenAI chat completion request");

    let response = http
        .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&ChatRequest { model, messages })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgoraError::ProviderStatus {
            provider: "openai".to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let data: ChatResponse = response.json().await?;

    // An absent or malformed content field degrades to an empty completion.
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
