//! Error types for the Agora core library.
//!
//! This module provides a unified error handling system for all Agora
//! operations, including provider calls, debate orchestration, scoring,
//! and the storage boundary.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Config | Missing credentials, endpoints, invalid settings |
//! | E2001-E2099 | Provider | Upstream LLM API failures |
//! | E3001-E3099 | Parse | Malformed structured output from LLM calls |
//! | E4001-E4099 | NotFound | Missing sessions, agents, scorer personas |
//! | E5001-E5099 | Session | Lifecycle and status transition errors |
//! | E6001-E6099 | Store | Storage-boundary failures |
//! | E9001-E9099 | General | Internal and IO errors |

use thiserror::Error;

/// The main error type for the Agora core library.
///
/// Fatality follows the orchestration contract: configuration and provider
/// errors abort the session that raised them, parse errors are always
/// recovered locally by the scoring and summary fallbacks, and store errors
/// propagate to the caller unchanged.
#[derive(Debug, Error)]
pub enum AgoraError {
    // ========================================================================
    // Configuration Errors (E1001-E1099)
    // ========================================================================
    /// A non-managed provider variant was invoked without its credential.
    #[error("[E1001] Missing API key for provider '{0}'")]
    MissingApiKey(String),

    /// The custom provider variant was invoked without a base URL.
    #[error("[E1002] Missing base URL for provider '{0}'")]
    MissingBaseUrl(String),

    /// Invalid configuration value
    #[error("[E1003] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    // ========================================================================
    // Provider Errors (E2001-E2099)
    // ========================================================================
    /// Upstream API returned a non-success status.
    #[error("[E2001] Provider '{provider}' returned status {status}: {body}")]
    ProviderStatus {
        provider: String,
        status: u16,
        body: String,
    },

    /// The HTTP exchange itself failed (connect, DNS, body read).
    #[error("[E2002] Provider request failed: {0}")]
    ProviderRequest(#[from] reqwest::Error),

    // ========================================================================
    // Parse Errors (E3001-E3099)
    // ========================================================================
    /// Structured LLM output could not be parsed.
    #[error("[E3001] Failed to parse LLM output: {0}")]
    MalformedOutput(String),

    // ========================================================================
    // NotFound Errors (E4001-E4099)
    // ========================================================================
    /// Session not found in the store.
    #[error("[E4001] Session not found: {0}")]
    SessionNotFound(String),

    /// Agent persona not found in the store.
    #[error("[E4002] Agent not found: {0}")]
    AgentNotFound(String),

    // ========================================================================
    // Session Errors (E5001-E5099)
    // ========================================================================
    /// Invalid session status transition
    #[error("[E5001] Invalid session status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// A scheduler is already driving this session.
    #[error("[E5002] Session already running: {0}")]
    SessionAlreadyRunning(String),

    /// A session was started with an empty participant roster.
    #[error("[E5003] Session has no participating agents: {0}")]
    EmptyRoster(String),

    // ========================================================================
    // Store Errors (E6001-E6099)
    // ========================================================================
    /// The storage collaborator failed an operation.
    #[error("[E6001] Store operation failed: {0}")]
    Store(String),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    /// Internal invariant violation.
    #[error("[E9001] Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("[E9002] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgoraError {
    /// Returns the bracketed error code embedded in the display string.
    pub fn code(&self) -> &'static str {
        match self {
            AgoraError::MissingApiKey(_) => "E1001",
            AgoraError::MissingBaseUrl(_) => "E1002",
            AgoraError::InvalidConfigValue { .. } => "E1003",
            AgoraError::ProviderStatus { .. } => "E2001",
            AgoraError::ProviderRequest(_) => "E2002",
            AgoraError::MalformedOutput(_) => "E3001",
            AgoraError::SessionNotFound(_) => "E4001",
            AgoraError::AgentNotFound(_) => "E4002",
            AgoraError::InvalidStatusTransition { .. } => "E5001",
            AgoraError::SessionAlreadyRunning(_) => "E5002",
            AgoraError::EmptyRoster(_) => "E5003",
            AgoraError::Store(_) => "E6001",
            AgoraError::Internal(_) => "E9001",
            AgoraError::Io(_) => "E9002",
        }
    }
}

/// Convenience result type used throughout the library.
pub type AgoraResult<T> = Result<T, AgoraError>;
