use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receiver sentinel: every debate turn is public, so messages are always
/// broadcast to the whole roster.
pub const BROADCAST_RECEIVER: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Free-text justifications attached to a message's scores, one per
/// dimension, in the scorers' own words.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReasons {
    pub logic: String,
    pub innovation: String,
    pub expression: String,
}

/// Scoring annotation filled in by the scoring pipeline after the fact.
///
/// Dimension scores are bounded to [0, 10] by the pipeline, so `total`
/// lands in [0, 30].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageScores {
    pub logic: u8,
    pub innovation: u8,
    pub expression: u8,
    pub total: u8,
    pub reasons: ScoreReasons,
    #[serde(default)]
    pub highlight: bool,
}

impl MessageScores {
    pub fn new(logic: u8, innovation: u8, expression: u8, reasons: ScoreReasons) -> Self {
        Self {
            logic,
            innovation,
            expression,
            total: logic + innovation + expression,
            reasons,
            highlight: false,
        }
    }
}

/// One utterance in a debate.
///
/// Created once by the scheduler after a successful completion; the scoring
/// annotation is the only field mutated afterwards, and only by the scoring
/// pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    /// Sending agent id.
    pub sender: String,
    /// `BROADCAST_RECEIVER` in this design; kept as a field for schema
    /// compatibility with directed messaging.
    pub receiver: String,
    pub content: String,
    pub round: u32,
    pub sentiment: Option<Sentiment>,
    pub scores: Option<MessageScores>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn broadcast(
        session_id: Uuid,
        sender: impl Into<String>,
        content: impl Into<String>,
        round: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            sender: sender.into(),
            receiver: BROADCAST_RECEIVER.to_string(),
            content: content.into(),
            round,
            sentiment: None,
            scores: None,
            created_at: Utc::now(),
        }
    }

    /// Total score if the message has been scored, 0 otherwise.
    pub fn total_score(&self) -> u8 {
        self.scores.as_ref().map(|s| s.total).unwrap_or(0)
    }
}
