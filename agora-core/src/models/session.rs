use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgoraError, AgoraResult};

/// Lifecycle status of a debate session.
///
/// `Paused` exists in the schema for forward compatibility; the scheduler
/// never enters it (pausing mid-round is an explicit non-goal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Error,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Paused => write!(f, "paused"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Error => write!(f, "error"),
        }
    }
}

/// Structured digest produced by the summary generator after the final round.
///
/// On any generation failure this carries the fixed placeholder text so a
/// provider outage never prevents a session from reaching `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateSummary {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub consensus: String,
    #[serde(default)]
    pub disagreements: Vec<String>,
    #[serde(default)]
    pub best_argument: Option<String>,
    #[serde(default)]
    pub most_innovative: Option<String>,
    #[serde(default)]
    pub notable_quotes: Vec<String>,
}

impl DebateSummary {
    /// The degraded digest returned when summary generation fails.
    pub fn placeholder() -> Self {
        Self {
            summary: "Unable to generate summary at this time.".to_string(),
            key_points: Vec::new(),
            consensus: String::new(),
            disagreements: Vec::new(),
            best_argument: None,
            most_innovative: None,
            notable_quotes: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.summary == "Unable to generate summary at this time."
    }
}

/// One full multi-round debate instance.
///
/// While running, the session is owned exclusively by its scheduler:
/// `current_round` and `status` are mutated only through scheduler-issued
/// transitions. Sessions are created in `Pending` by the session-creation
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub id: Uuid,
    pub user_id: i64,
    pub topic: String,
    /// Participant agent ids; order here is the fixed turn order per round.
    pub agent_ids: Vec<String>,
    pub max_rounds: u32,
    pub current_round: u32,
    pub status: SessionStatus,
    pub summary: Option<DebateSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DebateSession {
    pub fn new(user_id: i64, topic: impl Into<String>, agent_ids: Vec<String>, max_rounds: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            topic: topic.into(),
            agent_ids,
            max_rounds,
            current_round: 0,
            status: SessionStatus::Pending,
            summary: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Advance `current_round`. The counter is monotonically non-decreasing
    /// and never exceeds `max_rounds`.
    pub fn advance_round(&mut self, round: u32) -> AgoraResult<()> {
        if round < self.current_round || round > self.max_rounds {
            return Err(AgoraError::Internal(format!(
                "round {} out of range (current {}, max {})",
                round, self.current_round, self.max_rounds
            )));
        }
        self.current_round = round;
        self.updated_at = Utc::now();
        Ok(())
    }
}
