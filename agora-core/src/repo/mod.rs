//! Storage boundary for the orchestration engine.
//!
//! Persistence is an external collaborator: the engine consumes these
//! traits and never assumes a concrete backend. [`MemoryStore`] provides an
//! in-process implementation for tests and embedded callers.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AgoraResult;
use crate::models::{Agent, DebateSession, DebateSummary, Message, MessageScores, SessionStatus};
use crate::providers::ProviderConfig;

/// Agent persona roster lookup.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get_agent(&self, id: &str) -> AgoraResult<Option<Agent>>;
    async fn list_agents(&self) -> AgoraResult<Vec<Agent>>;
}

/// Debate session CRUD. `update_*` methods are the only mutation paths the
/// scheduler uses while a session is running.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &DebateSession) -> AgoraResult<()>;
    async fn get_session(&self, id: Uuid) -> AgoraResult<Option<DebateSession>>;
    async fn list_sessions_for_user(&self, user_id: i64) -> AgoraResult<Vec<DebateSession>>;
    async fn update_status(&self, id: Uuid, status: SessionStatus) -> AgoraResult<()>;
    async fn update_round(&self, id: Uuid, round: u32) -> AgoraResult<()>;
    async fn update_summary(&self, id: Uuid, summary: &DebateSummary) -> AgoraResult<()>;
}

/// Message persistence. `update_scores` and `set_highlight` are reserved
/// for the scoring pipeline; everything else is created once and immutable.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_message(&self, message: &Message) -> AgoraResult<()>;
    /// All messages for a session in creation order.
    async fn list_messages(&self, session_id: Uuid) -> AgoraResult<Vec<Message>>;
    async fn update_scores(&self, message_id: Uuid, scores: &MessageScores) -> AgoraResult<()>;
    async fn set_highlight(&self, message_id: Uuid, highlight: bool) -> AgoraResult<()>;
}

/// Per-user active provider configuration lookup. `None` means the caller
/// has not configured a provider and the managed backend is used.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn active_config(&self, user_id: i64) -> AgoraResult<Option<ProviderConfig>>;
}
