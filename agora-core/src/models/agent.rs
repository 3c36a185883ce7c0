use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Turn state for a single agent within a running debate.
///
/// Transitions are driven exclusively by the round scheduler; agents are
/// passive prompt templates and never change their own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Thinking,
    Speaking,
    Waiting,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Thinking => write!(f, "thinking"),
            AgentStatus::Speaking => write!(f, "speaking"),
            AgentStatus::Waiting => write!(f, "waiting"),
        }
    }
}

/// A debate persona: fixed identity plus the system prompt shaping its
/// argumentative style. Immutable once referenced by a running session.
///
/// Ids are free-form strings because the scoring pipeline depends on the
/// fixed ids `logic_scorer`, `innovation_scorer` and `expression_scorer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub profile: String,
    pub system_prompt: String,
    /// Display color for the presentation layer; irrelevant to core logic.
    pub color: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        profile: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            profile: profile.into(),
            system_prompt: system_prompt.into(),
            color: "#888888".to_string(),
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
