//! Observer-facing event broadcast.
//!
//! The scheduler emits [`DebateEvent`]s into a per-session broadcast
//! channel; observers `join` a session to receive them. Slow observers lag
//! and drop events rather than ever blocking orchestration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::models::{AgentStatus, DebateSession, Message};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Push events observers receive while watching a debate.
///
/// Wire names match the original socket contract (`agent-status`,
/// `new-message`, `round-complete`, `debate-complete`, `error`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum DebateEvent {
    #[serde(rename_all = "camelCase")]
    AgentStatus {
        agent_id: String,
        status: AgentStatus,
    },
    NewMessage {
        message: Message,
    },
    RoundComplete {
        round: u32,
    },
    DebateComplete {
        session: DebateSession,
    },
    Error {
        message: String,
    },
}

/// Per-session broadcast channels.
///
/// Channels are created lazily on first `subscribe` or `emit`; emitting
/// with no subscribers is a silent drop, matching fire-and-forget push
/// semantics.
pub struct EventBus {
    channels: RwLock<HashMap<Uuid, broadcast::Sender<DebateEvent>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    async fn sender(&self, session_id: Uuid) -> broadcast::Sender<DebateEvent> {
        if let Some(sender) = self.channels.read().await.get(&session_id) {
            return sender.clone();
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribe to a session's event stream (the `join` command).
    pub async fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<DebateEvent> {
        self.sender(session_id).await.subscribe()
    }

    /// Broadcast an event to all observers of a session.
    pub async fn emit(&self, session_id: Uuid, event: DebateEvent) {
        let sender = self.sender(session_id).await;
        // A send error just means nobody is listening.
        if sender.send(event).is_err() {
            debug!(%session_id, "Event dropped: no subscribers");
        }
    }

    /// Drop a session's channel once its terminal event has been emitted.
    /// Subscribers still drain whatever their receivers have buffered, then
    /// see the stream as closed.
    pub async fn remove(&self, session_id: Uuid) {
        self.channels.write().await.remove(&session_id);
    }
}
