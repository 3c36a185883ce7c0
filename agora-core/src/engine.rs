//! Round scheduler / turn state machine.
//!
//! One logical orchestration flow per debate session, sequential by design:
//! each turn's prompt depends on all previously produced messages, so agent
//! turns inside a round and rounds inside a session execute strictly one
//! after another. Scoring is the only detached work; it is dispatched and
//! never joined. There is no cancellation: a caller that disconnects does
//! not halt a running session.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{AgoraError, AgoraResult};
use crate::events::{DebateEvent, EventBus};
use crate::models::{Agent, AgentStatus, DebateSession, Message, SessionStatus};
use crate::providers::{ChatClient, ChatMessage, ProviderConfig};
use crate::repo::{AgentStore, MessageStore, ProviderStore, SessionStore};
use crate::scoring::ScoringPipeline;
use crate::summary::SummaryGenerator;

/// Fallback text when a provider returns an empty completion; the round
/// still progresses.
const EMPTY_COMPLETION_STAND_IN: &str = "I have no response at this time.";

/// The orchestration core: drives sessions from `pending` to `completed`
/// (or `error`), emitting events throughout.
pub struct DebateEngine {
    agents: Arc<dyn AgentStore>,
    sessions: Arc<dyn SessionStore>,
    messages: Arc<dyn MessageStore>,
    providers: Arc<dyn ProviderStore>,
    chat: ChatClient,
    scoring: Arc<ScoringPipeline>,
    summary: SummaryGenerator,
    events: Arc<EventBus>,
    config: EngineConfig,
    /// Sessions with a scheduler currently in flight. A second `start` for
    /// the same session is rejected instead of racing the first.
    active: Mutex<HashSet<Uuid>>,
}

/// Removes a session from the in-flight set on every exit path.
struct ActiveGuard<'a> {
    engine: &'a DebateEngine,
    session_id: Uuid,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.engine.active.lock() {
            active.remove(&self.session_id);
        }
    }
}

impl DebateEngine {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        sessions: Arc<dyn SessionStore>,
        messages: Arc<dyn MessageStore>,
        providers: Arc<dyn ProviderStore>,
        chat: ChatClient,
        config: EngineConfig,
    ) -> Self {
        let scoring = Arc::new(ScoringPipeline::new(
            Arc::clone(&agents),
            Arc::clone(&messages),
            Arc::clone(&providers),
            chat.clone(),
            config.scoring_context_messages,
        ));
        let summary = SummaryGenerator::new(chat.clone());

        Self {
            agents,
            sessions,
            messages,
            providers,
            chat,
            scoring,
            summary,
            events: Arc::new(EventBus::default()),
            config,
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn scoring(&self) -> Arc<ScoringPipeline> {
        Arc::clone(&self.scoring)
    }

    /// Run a full debate session to completion.
    ///
    /// Only meaningful once, from `pending`; a concurrent second start for
    /// the same session is rejected with `SessionAlreadyRunning`. Any turn
    /// failure marks the session `error`, emits an `error` event, and
    /// re-raises. Already-persisted messages are never rolled back.
    pub async fn run_session(&self, session_id: Uuid) -> AgoraResult<DebateSession> {
        {
            let mut active = self
                .active
                .lock()
                .map_err(|_| AgoraError::Internal("active-session lock poisoned".to_string()))?;
            if !active.insert(session_id) {
                return Err(AgoraError::SessionAlreadyRunning(session_id.to_string()));
            }
        }
        let _guard = ActiveGuard {
            engine: self,
            session_id,
        };

        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| AgoraError::SessionNotFound(session_id.to_string()))?;

        if session.status != SessionStatus::Pending {
            return Err(AgoraError::InvalidStatusTransition {
                from: session.status.to_string(),
                to: SessionStatus::Running.to_string(),
            });
        }

        info!(
            %session_id,
            topic = %session.topic,
            max_rounds = session.max_rounds,
            "Starting debate session"
        );

        let outcome = match self.drive(&session).await {
            Ok(finished) => Ok(finished),
            Err(e) => {
                error!(%session_id, "Debate session failed: {}", e);
                if let Err(store_err) = self
                    .sessions
                    .update_status(session_id, SessionStatus::Error)
                    .await
                {
                    warn!(%session_id, "Failed to mark session errored: {}", store_err);
                }
                self.events
                    .emit(
                        session_id,
                        DebateEvent::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
                Err(e)
            }
        };

        // The terminal event has been emitted; drop the channel. Observers
        // still drain whatever their receivers have buffered.
        self.events.remove(session_id).await;
        outcome
    }

    /// Roster agents in session order; aborts before any turn if one is
    /// missing.
    async fn load_roster(&self, session: &DebateSession) -> AgoraResult<Vec<Agent>> {
        if session.agent_ids.is_empty() {
            return Err(AgoraError::EmptyRoster(session.id.to_string()));
        }
        let mut roster = Vec::with_capacity(session.agent_ids.len());
        for id in &session.agent_ids {
            let agent = self
                .agents
                .get_agent(id)
                .await?
                .ok_or_else(|| AgoraError::AgentNotFound(id.clone()))?;
            roster.push(agent);
        }
        Ok(roster)
    }

    async fn drive(&self, session: &DebateSession) -> AgoraResult<DebateSession> {
        let roster = self.load_roster(session).await?;

        self.sessions
            .update_status(session.id, SessionStatus::Running)
            .await?;

        for round in 1..=session.max_rounds {
            self.sessions.update_round(session.id, round).await?;
            self.run_round(session, &roster, round).await?;
            info!(session_id = %session.id, round, "Round complete");
            self.events
                .emit(session.id, DebateEvent::RoundComplete { round })
                .await;
        }

        // Highlights use whatever scores have landed by now; scoring that
        // finishes later updates annotations but not the selection.
        if let Err(e) = self.scoring.mark_highlights(session.id).await {
            warn!(session_id = %session.id, "Highlight selection failed: {}", e);
        }

        let transcript = self.messages.list_messages(session.id).await?;
        // Summary generation is infallible, so a config lookup failure here
        // degrades to the managed backend instead of failing the session.
        let config = match self.resolve_provider(session.user_id).await {
            Ok(config) => config,
            Err(e) => {
                warn!(session_id = %session.id, "Provider config lookup failed: {}", e);
                ProviderConfig::managed()
            }
        };
        let summary = self
            .summary
            .generate(
                &session.topic,
                &roster,
                &transcript,
                &config,
                self.config.summary_excerpts,
            )
            .await;

        self.sessions.update_summary(session.id, &summary).await?;
        self.sessions
            .update_status(session.id, SessionStatus::Completed)
            .await?;

        for agent in &roster {
            self.emit_status(session.id, &agent.id, AgentStatus::Idle)
                .await;
        }

        let finished = self
            .sessions
            .get_session(session.id)
            .await?
            .ok_or_else(|| AgoraError::SessionNotFound(session.id.to_string()))?;

        info!(session_id = %session.id, "Debate session completed");
        self.events
            .emit(
                session.id,
                DebateEvent::DebateComplete {
                    session: finished.clone(),
                },
            )
            .await;

        Ok(finished)
    }

    /// One round: every agent speaks once, in roster order, against the
    /// transcript as persisted at the start of the round.
    async fn run_round(
        &self,
        session: &DebateSession,
        roster: &[Agent],
        round: u32,
    ) -> AgoraResult<()> {
        let prior = self.messages.list_messages(session.id).await?;

        for agent in roster {
            self.emit_status(session.id, &agent.id, AgentStatus::Thinking)
                .await;

            let prompt = build_agent_prompt(
                agent,
                &session.topic,
                roster,
                &prior,
                round,
                session.max_rounds,
            );
            let config = match self.resolve_provider(session.user_id).await {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        agent = %agent.id,
                        round,
                        "Turn failed: {}",
                        e
                    );
                    self.emit_status(session.id, &agent.id, AgentStatus::Idle)
                        .await;
                    return Err(e);
                }
            };
            let request = [
                ChatMessage::system(&agent.system_prompt),
                ChatMessage::user(prompt),
            ];

            let completion = match self.chat.chat(&request, &config).await {
                Ok(completion) => completion,
                Err(e) => {
                    // Fatal for the turn; no partial retry.
                    warn!(
                        session_id = %session.id,
                        agent = %agent.id,
                        round,
                        "Turn failed: {}",
                        e
                    );
                    self.emit_status(session.id, &agent.id, AgentStatus::Idle)
                        .await;
                    return Err(e);
                }
            };

            let content = if completion.content.is_empty() {
                EMPTY_COMPLETION_STAND_IN.to_string()
            } else {
                completion.content
            };

            self.emit_status(session.id, &agent.id, AgentStatus::Speaking)
                .await;

            let message = Message::broadcast(session.id, &agent.id, content, round);
            self.messages.create_message(&message).await?;
            debug!(
                session_id = %session.id,
                agent = %agent.id,
                message_id = %message.id,
                round,
                "Message persisted"
            );
            self.events
                .emit(
                    session.id,
                    DebateEvent::NewMessage {
                        message: message.clone(),
                    },
                )
                .await;

            // Fire and forget: round progression never waits on scoring.
            if self.config.scoring_enabled {
                let _ = self.scoring.spawn_score(
                    message,
                    session.topic.clone(),
                    prior.clone(),
                    session.user_id,
                );
            }

            self.emit_status(session.id, &agent.id, AgentStatus::Waiting)
                .await;

            // Pacing for live observers, not a correctness mechanism.
            if self.config.turn_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.turn_delay_ms)).await;
            }
        }

        Ok(())
    }

    /// Active provider config for a user. No configured provider means the
    /// managed backend; a store failure propagates.
    async fn resolve_provider(&self, user_id: i64) -> AgoraResult<ProviderConfig> {
        Ok(self
            .providers
            .active_config(user_id)
            .await?
            .unwrap_or_else(ProviderConfig::managed))
    }

    async fn emit_status(&self, session_id: Uuid, agent_id: &str, status: AgentStatus) {
        self.events
            .emit(
                session_id,
                DebateEvent::AgentStatus {
                    agent_id: agent_id.to_string(),
                    status,
                },
            )
            .await;
    }
}

/// Control surface for observers: `join` a session's event stream and
/// `start` its orchestration.
///
/// `start` runs the engine on a detached task, so a caller that disconnects
/// does not halt the debate; failures surface as `error` events and the
/// `error` session status.
pub struct DebateHub {
    engine: Arc<DebateEngine>,
}

impl DebateHub {
    pub fn new(engine: Arc<DebateEngine>) -> Self {
        Self { engine }
    }

    pub async fn join(
        &self,
        session_id: Uuid,
    ) -> tokio::sync::broadcast::Receiver<DebateEvent> {
        self.engine.events().subscribe(session_id).await
    }

    pub fn start(&self, session_id: Uuid) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            if let Err(e) = engine.run_session(session_id).await {
                // run_session already emitted the error event and status.
                error!(%session_id, "Detached debate run ended in error: {}", e);
            }
        })
    }
}

fn agent_name<'a>(roster: &'a [Agent], id: &'a str) -> &'a str {
    roster
        .iter()
        .find(|a| a.id == id)
        .map(|a| a.name.as_str())
        .unwrap_or(id)
}

/// Prompt for one agent turn: persona framing, topic, full transcript (or
/// a beginning-of-debate placeholder), and the round instruction targeting
/// 100-150 words.
fn build_agent_prompt(
    agent: &Agent,
    topic: &str,
    roster: &[Agent],
    prior: &[Message],
    round: u32,
    max_rounds: u32,
) -> String {
    let history = if prior.is_empty() {
        "This is the beginning of the debate.".to_string()
    } else {
        prior
            .iter()
            .map(|m| format!("{}: {}", agent_name(roster, &m.sender), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let instruction = if prior.is_empty() {
        "As the first speaker, provide your initial perspective on this topic in 100-150 words."
    } else {
        "Respond to the previous arguments, state your position, and provide your analysis in 100-150 words."
    };

    format!(
        "## BACKGROUND\nYou are {}, {}.\n{}\n\n\
         ## DEBATE TOPIC\n{}\n\n\
         ## DEBATE HISTORY\n{}\n\n\
         ## YOUR TURN\nRound {} of {}.\n{}",
        agent.name, agent.profile, agent.system_prompt, topic, history, round, max_rounds,
        instruction
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Agent> {
        vec![
            Agent::new("optimist", "The Optimist", "hopeful futurist", "Be hopeful."),
            Agent::new("skeptic", "The Skeptic", "cautious analyst", "Be cautious."),
        ]
    }

    #[test]
    fn test_prompt_first_speaker() {
        let roster = roster();
        let prompt = build_agent_prompt(&roster[0], "Ban cars?", &roster, &[], 1, 3);

        assert!(prompt.contains("You are The Optimist, hopeful futurist."));
        assert!(prompt.contains("Be hopeful."));
        assert!(prompt.contains("Ban cars?"));
        assert!(prompt.contains("This is the beginning of the debate."));
        assert!(prompt.contains("Round 1 of 3."));
        assert!(prompt.contains("initial perspective"));
    }

    #[test]
    fn test_prompt_with_history_resolves_names() {
        let roster = roster();
        let prior = vec![Message::broadcast(
            Uuid::new_v4(),
            "optimist",
            "Cities thrive without cars.",
            1,
        )];
        let prompt = build_agent_prompt(&roster[1], "Ban cars?", &roster, &prior, 2, 3);

        assert!(prompt.contains("The Optimist: Cities thrive without cars."));
        assert!(prompt.contains("Round 2 of 3."));
        assert!(prompt.contains("Respond to the previous arguments"));
        assert!(!prompt.contains("beginning of the debate"));
    }

    #[test]
    fn test_prompt_unknown_sender_falls_back_to_id() {
        let roster = roster();
        let prior = vec![Message::broadcast(Uuid::new_v4(), "ghost", "Hello.", 1)];
        let prompt = build_agent_prompt(&roster[0], "t", &roster, &prior, 1, 1);
        assert!(prompt.contains("ghost: Hello."));
    }
}
