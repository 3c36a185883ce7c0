use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgoraError, AgoraResult};
use crate::models::{Agent, DebateSession, DebateSummary, Message, MessageScores, SessionStatus};
use crate::providers::ProviderConfig;

use super::{AgentStore, MessageStore, ProviderStore, SessionStore};

/// In-memory implementation of every store trait.
///
/// Messages keep insertion order so `list_messages` reflects turn order
/// without a sort.
#[derive(Default)]
pub struct MemoryStore {
    agents: RwLock<HashMap<String, Agent>>,
    sessions: RwLock<HashMap<Uuid, DebateSession>>,
    messages: RwLock<Vec<Message>>,
    provider_configs: RwLock<HashMap<i64, ProviderConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_agent(&self, agent: Agent) {
        self.agents.write().await.insert(agent.id.clone(), agent);
    }

    pub async fn set_provider_config(&self, user_id: i64, config: ProviderConfig) {
        self.provider_configs.write().await.insert(user_id, config);
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn get_agent(&self, id: &str) -> AgoraResult<Option<Agent>> {
        Ok(self.agents.read().await.get(id).cloned())
    }

    async fn list_agents(&self) -> AgoraResult<Vec<Agent>> {
        Ok(self.agents.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &DebateSession) -> AgoraResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> AgoraResult<Option<DebateSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn list_sessions_for_user(&self, user_id: i64) -> AgoraResult<Vec<DebateSession>> {
        let mut sessions: Vec<DebateSession> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn update_status(&self, id: Uuid, status: SessionStatus) -> AgoraResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AgoraError::SessionNotFound(id.to_string()))?;
        session.status = status;
        let now = Utc::now();
        session.updated_at = now;
        if status == SessionStatus::Completed {
            session.completed_at = Some(now);
        }
        Ok(())
    }

    async fn update_round(&self, id: Uuid, round: u32) -> AgoraResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AgoraError::SessionNotFound(id.to_string()))?;
        session.advance_round(round)?;
        Ok(())
    }

    async fn update_summary(&self, id: Uuid, summary: &DebateSummary) -> AgoraResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AgoraError::SessionNotFound(id.to_string()))?;
        session.summary = Some(summary.clone());
        session.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create_message(&self, message: &Message) -> AgoraResult<()> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> AgoraResult<Vec<Message>> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn update_scores(&self, message_id: Uuid, scores: &MessageScores) -> AgoraResult<()> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| AgoraError::Store(format!("message not found: {}", message_id)))?;
        message.scores = Some(scores.clone());
        Ok(())
    }

    async fn set_highlight(&self, message_id: Uuid, highlight: bool) -> AgoraResult<()> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| AgoraError::Store(format!("message not found: {}", message_id)))?;
        if let Some(scores) = message.scores.as_mut() {
            scores.highlight = highlight;
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn active_config(&self, user_id: i64) -> AgoraResult<Option<ProviderConfig>> {
        Ok(self.provider_configs.read().await.get(&user_id).cloned())
    }
}
