//! Chat provider abstraction.
//!
//! One uniform "send messages, get completion" contract over four backend
//! variants: the credential-free managed backend, OpenAI, Anthropic, and an
//! arbitrary OpenAI-compatible custom endpoint. Variants differ only in
//! request shaping and response field extraction; the contract and error
//! behavior are identical. Every call is a single request/response exchange
//! with no retries, timeouts, or streaming.

pub mod anthropic;
pub mod custom;
pub mod managed;
pub mod openai;

pub use managed::{HttpManagedBackend, ManagedBackend};

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AgoraResult;

/// Role tag for a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Token accounting reported by a provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion returned by any provider variant.
///
/// `content` may be empty: a malformed or absent content field in the
/// upstream response degrades to an empty string rather than an error, so
/// callers must tolerate empty completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Built-in managed backend; requires no credentials.
    Managed,
    OpenAi,
    Anthropic,
    /// Arbitrary OpenAI-compatible endpoint.
    Custom,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Managed => write!(f, "managed"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Custom => write!(f, "custom"),
        }
    }
}

/// Per-user provider selection plus the credentials/overrides it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl ProviderConfig {
    /// The default configuration when a user has none: the managed backend.
    pub fn managed() -> Self {
        Self {
            kind: ProviderKind::Managed,
            api_key: None,
            base_url: None,
            model: None,
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            api_key: Some(api_key.into()),
            base_url: None,
            model: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Entry point for all chat completions.
///
/// Dispatches on [`ProviderKind`] to the variant-specific request builder
/// and response parser. The managed variant is routed through an injected
/// [`ManagedBackend`] so hosts (and tests) control what backs it.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    managed: Arc<dyn ManagedBackend>,
}

impl ChatClient {
    pub fn new(managed: Arc<dyn ManagedBackend>) -> Self {
        Self {
            http: Client::new(),
            managed,
        }
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &ProviderConfig,
    ) -> AgoraResult<ChatCompletion> {
        debug!(provider = %config.kind, turns = messages.len(), "Dispatching chat completion");
        match config.kind {
            ProviderKind::Managed => self.managed.complete(messages).await,
            ProviderKind::OpenAi => openai::chat(&self.http, messages, config).await,
            ProviderKind::Anthropic => anthropic::chat(&self.http, messages, config).await,
            ProviderKind::Custom => custom::chat(&self.http, messages, config).await,
        }
    }
}
