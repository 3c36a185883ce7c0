//! Background scoring pipeline.
//!
//! Every utterance is fanned out to three fixed scorer personas (logic,
//! innovation, expression) whose verdicts are merged into the message's
//! scoring annotation. The pipeline is dispatched fire-and-forget by the
//! scheduler: it never delays round progression, and its annotation write
//! may land after the round (or the whole session) has already advanced.

use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AgoraResult;
use crate::models::{Agent, Message, MessageScores, ScoreReasons};
use crate::providers::{ChatClient, ChatMessage, ProviderConfig};
use crate::repo::{AgentStore, MessageStore, ProviderStore};

/// Fixed scorer persona ids; part of the storage contract.
pub const LOGIC_SCORER_ID: &str = "logic_scorer";
pub const INNOVATION_SCORER_ID: &str = "innovation_scorer";
pub const EXPRESSION_SCORER_ID: &str = "expression_scorer";

/// Neutral per-dimension score substituted when a verdict is unusable.
const NEUTRAL_SCORE: u8 = 5;

/// One scorer's verdict for a single dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    /// Bounded to [0, 10].
    pub score: u8,
    pub reason: String,
}

impl ScoreResult {
    fn fallback(reason: &str) -> Self {
        Self {
            score: NEUTRAL_SCORE,
            reason: reason.to_string(),
        }
    }
}

/// Raw scorer output before clamping.
#[derive(Debug, Deserialize)]
struct ScorerVerdict {
    score: Option<f64>,
    reason: Option<String>,
}

pub struct ScoringPipeline {
    agents: Arc<dyn AgentStore>,
    messages: Arc<dyn MessageStore>,
    providers: Arc<dyn ProviderStore>,
    chat: ChatClient,
    /// How many prior messages the scorers see verbatim.
    context_messages: usize,
}

impl ScoringPipeline {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        messages: Arc<dyn MessageStore>,
        providers: Arc<dyn ProviderStore>,
        chat: ChatClient,
        context_messages: usize,
    ) -> Self {
        Self {
            agents,
            messages,
            providers,
            chat,
            context_messages,
        }
    }

    /// Score one message along all three dimensions.
    ///
    /// Infallible by contract: unresolvable scorer personas yield the fixed
    /// neutral annotation, and each dimension falls back independently on a
    /// failed or unparsable call.
    pub async fn score_message(
        &self,
        message: &Message,
        topic: &str,
        prior: &[Message],
        user_id: i64,
    ) -> MessageScores {
        debug!(message_id = %message.id, "Scoring message");

        let (logic_scorer, innovation_scorer, expression_scorer) = match self.resolve_scorers().await
        {
            Some(scorers) => scorers,
            None => {
                warn!("Scorer personas not found, returning neutral scores");
                let reasons = ScoreReasons {
                    logic: "scorer not initialized".to_string(),
                    innovation: "scorer not initialized".to_string(),
                    expression: "scorer not initialized".to_string(),
                };
                return MessageScores::new(NEUTRAL_SCORE, NEUTRAL_SCORE, NEUTRAL_SCORE, reasons);
            }
        };

        let config = self
            .providers
            .active_config(user_id)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(ProviderConfig::managed);

        let context_text = self.build_context(message, topic, prior);

        // The three dimensions are independent and individually
        // fault-isolated; one bad verdict never taints the others.
        let (logic, innovation, expression) = tokio::join!(
            self.score_with_agent(&logic_scorer, &context_text, &config),
            self.score_with_agent(&innovation_scorer, &context_text, &config),
            self.score_with_agent(&expression_scorer, &context_text, &config),
        );

        debug!(
            message_id = %message.id,
            logic = logic.score,
            innovation = innovation.score,
            expression = expression.score,
            "Scoring completed"
        );

        MessageScores::new(
            logic.score,
            innovation.score,
            expression.score,
            ScoreReasons {
                logic: logic.reason,
                innovation: innovation.reason,
                expression: expression.reason,
            },
        )
    }

    /// Dispatch scoring as a detached task with its own error boundary.
    ///
    /// The returned handle is ignored by the scheduler; tests may await it
    /// for determinism. A failure inside the task is logged and contained.
    pub fn spawn_score(
        self: &Arc<Self>,
        message: Message,
        topic: String,
        prior: Vec<Message>,
        user_id: i64,
    ) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let scores = pipeline
                .score_message(&message, &topic, &prior, user_id)
                .await;
            if let Err(e) = pipeline.messages.update_scores(message.id, &scores).await {
                warn!(message_id = %message.id, "Failed to store scores: {}", e);
            }
        })
    }

    async fn resolve_scorers(&self) -> Option<(Agent, Agent, Agent)> {
        let logic = self.agents.get_agent(LOGIC_SCORER_ID).await.ok().flatten();
        let innovation = self
            .agents
            .get_agent(INNOVATION_SCORER_ID)
            .await
            .ok()
            .flatten();
        let expression = self
            .agents
            .get_agent(EXPRESSION_SCORER_ID)
            .await
            .ok()
            .flatten();

        match (logic, innovation, expression) {
            (Some(l), Some(i), Some(e)) => Some((l, i, e)),
            _ => None,
        }
    }

    fn build_context(&self, message: &Message, topic: &str, prior: &[Message]) -> String {
        let mut text = format!("Debate topic: {}\n\n", topic);

        if !prior.is_empty() {
            text.push_str("Previous discussion:\n");
            let start = prior.len().saturating_sub(self.context_messages);
            for msg in &prior[start..] {
                text.push_str(&format!("{}: {}\n\n", msg.sender, msg.content));
            }
        }

        text.push_str(&format!(
            "\nStatement to score:\n{}: {}",
            message.sender, message.content
        ));

        text
    }

    async fn score_with_agent(
        &self,
        scorer: &Agent,
        context_text: &str,
        config: &ProviderConfig,
    ) -> ScoreResult {
        let messages = [
            ChatMessage::system(&scorer.system_prompt),
            ChatMessage::user(context_text),
        ];

        let completion = match self.chat.chat(&messages, config).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(scorer = %scorer.id, "Scorer call failed: {}", e);
                return ScoreResult::fallback("score parse failed");
            }
        };

        match parse_verdict(&completion.content) {
            Some(result) => result,
            None => {
                warn!(scorer = %scorer.id, "Unparsable scorer output");
                ScoreResult::fallback("score parse failed")
            }
        }
    }

    /// Persist highlight flags for a session: rank scored messages and flag
    /// the selection through the message store.
    pub async fn mark_highlights(&self, session_id: Uuid) -> AgoraResult<Vec<Uuid>> {
        let messages = self.messages.list_messages(session_id).await?;
        let highlights = select_highlights(&messages);
        for id in &highlights {
            self.messages.set_highlight(*id, true).await?;
        }
        Ok(highlights)
    }
}

/// Parse one scorer verdict, tolerating code-fence wrapping and
/// out-of-range scores. Returns `None` only when the payload is not valid
/// JSON at all.
fn parse_verdict(raw: &str) -> Option<ScoreResult> {
    let cleaned = strip_code_fences(raw);
    let verdict: ScorerVerdict = serde_json::from_str(&cleaned).ok()?;

    let score = verdict
        .score
        .map(|s| s.clamp(0.0, 10.0).round() as u8)
        .unwrap_or(NEUTRAL_SCORE);
    let reason = verdict
        .reason
        .unwrap_or_else(|| "no reason given".to_string());

    Some(ScoreResult { score, reason })
}

/// Strip Markdown code-fence wrapping (with or without a language tag)
/// before structured parsing.
pub(crate) fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let without_open = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return String::new(),
    };
    without_open
        .trim_end()
        .trim_end_matches("```")
        .trim()
        .to_string()
}

/// Rank all scored messages descending by total and pick the top 20%
/// (minimum 3, capped at the scored-message count). Unscored messages
/// (total 0 or absent) never participate.
pub fn select_highlights(messages: &[Message]) -> Vec<Uuid> {
    let mut scored: Vec<&Message> = messages.iter().filter(|m| m.total_score() > 0).collect();
    if scored.is_empty() {
        return Vec::new();
    }

    scored.sort_by(|a, b| b.total_score().cmp(&a.total_score()));

    let count = ((scored.len() as f64 * 0.2).ceil() as usize)
        .max(3)
        .min(scored.len());

    scored.iter().take(count).map(|m| m.id).collect()
}
