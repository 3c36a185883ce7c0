//! Debate summary generation.
//!
//! One structured-output LLM call that distills the full transcript (plus
//! the top-scored excerpts, when any exist) into a [`DebateSummary`]. The
//! generator is infallible from the caller's point of view: any failure
//! degrades to the fixed placeholder digest so a provider outage never
//! prevents a session from completing.

use serde::Deserialize;
use tracing::warn;

use crate::error::{AgoraError, AgoraResult};
use crate::models::{Agent, DebateSummary, Message};
use crate::providers::{ChatClient, ChatMessage, ProviderConfig};
use crate::scoring::strip_code_fences;

const ANALYST_SYSTEM_PROMPT: &str =
    "You are an expert debate analyst. Provide objective, balanced analysis.";

/// `consensus` sometimes arrives as a list of agreement points instead of a
/// single statement; both shapes are accepted and lists are joined.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConsensusField {
    One(String),
    Many(Vec<String>),
}

impl ConsensusField {
    fn into_string(self) -> String {
        match self {
            ConsensusField::One(s) => s,
            ConsensusField::Many(items) => items.join("; "),
        }
    }
}

impl Default for ConsensusField {
    fn default() -> Self {
        ConsensusField::One(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    consensus: ConsensusField,
    #[serde(default)]
    disagreements: Vec<String>,
    #[serde(default)]
    best_argument: Option<String>,
    #[serde(default)]
    most_innovative: Option<String>,
    #[serde(default)]
    notable_quotes: Vec<String>,
}

pub struct SummaryGenerator {
    chat: ChatClient,
}

impl SummaryGenerator {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    /// Produce the structured digest for a finished debate.
    ///
    /// An empty transcript short-circuits to the placeholder without an LLM
    /// call.
    pub async fn generate(
        &self,
        topic: &str,
        agents: &[Agent],
        messages: &[Message],
        config: &ProviderConfig,
        excerpt_count: usize,
    ) -> DebateSummary {
        if messages.is_empty() {
            return DebateSummary::placeholder();
        }

        match self
            .try_generate(topic, agents, messages, config, excerpt_count)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summary generation failed, returning placeholder: {}", e);
                DebateSummary::placeholder()
            }
        }
    }

    async fn try_generate(
        &self,
        topic: &str,
        agents: &[Agent],
        messages: &[Message],
        config: &ProviderConfig,
        excerpt_count: usize,
    ) -> AgoraResult<DebateSummary> {
        let prompt = build_prompt(topic, agents, messages, excerpt_count);
        let request = [
            ChatMessage::system(ANALYST_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        let completion = self.chat.chat(&request, config).await?;
        if completion.content.is_empty() {
            return Err(AgoraError::MalformedOutput(
                "empty summary response".to_string(),
            ));
        }

        let cleaned = strip_code_fences(&completion.content);
        let raw: RawSummary = serde_json::from_str(&cleaned)
            .map_err(|e| AgoraError::MalformedOutput(e.to_string()))?;

        Ok(DebateSummary {
            summary: raw.summary,
            key_points: raw.key_points,
            consensus: raw.consensus.into_string(),
            disagreements: raw.disagreements,
            best_argument: raw.best_argument,
            most_innovative: raw.most_innovative,
            notable_quotes: raw.notable_quotes,
        })
    }
}

fn agent_name<'a>(agents: &'a [Agent], id: &'a str) -> &'a str {
    agents
        .iter()
        .find(|a| a.id == id)
        .map(|a| a.name.as_str())
        .unwrap_or(id)
}

fn build_prompt(
    topic: &str,
    agents: &[Agent],
    messages: &[Message],
    excerpt_count: usize,
) -> String {
    let participants = agents
        .iter()
        .map(|a| format!("- {}: {}", a.name, a.profile))
        .collect::<Vec<_>>()
        .join("\n");

    let conversation = messages
        .iter()
        .map(|m| {
            format!(
                "**{}** (Round {}):\n{}",
                agent_name(agents, &m.sender),
                m.round,
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!(
        "Analyze the following debate and provide a comprehensive summary.\n\n\
         ## DEBATE TOPIC\n{}\n\n\
         ## PARTICIPANTS\n{}\n\n\
         ## CONVERSATION\n{}\n",
        topic, participants, conversation
    );

    let excerpts = top_excerpts(messages, excerpt_count);
    if !excerpts.is_empty() {
        prompt.push_str("\n## HIGHEST-SCORED STATEMENTS\n");
        for m in excerpts {
            prompt.push_str(&format!(
                "- {} (score {}): {}\n",
                agent_name(agents, &m.sender),
                m.total_score(),
                m.content
            ));
        }
    }

    prompt.push_str(
        "\n## TASK\nProvide a JSON response with the following structure:\n\
         {\n\
         \x20 \"summary\": \"A comprehensive 2-3 paragraph summary of the entire debate\",\n\
         \x20 \"keyPoints\": [\"Key point 1\", \"Key point 2\", \"Key point 3\"],\n\
         \x20 \"consensus\": \"A single statement describing where participants agree\",\n\
         \x20 \"disagreements\": [\"Point of disagreement 1\", \"Point of disagreement 2\"],\n\
         \x20 \"bestArgument\": \"The single strongest argument made (optional)\",\n\
         \x20 \"mostInnovative\": \"The most original contribution (optional)\",\n\
         \x20 \"notableQuotes\": [\"A short memorable quote\", \"Another quote\"]\n\
         }",
    );

    prompt
}

/// Top scored messages, descending by total, for the prompt's excerpt block.
fn top_excerpts(messages: &[Message], count: usize) -> Vec<&Message> {
    let mut scored: Vec<&Message> = messages.iter().filter(|m| m.total_score() > 0).collect();
    scored.sort_by(|a, b| b.total_score().cmp(&a.total_score()));
    scored.truncate(count);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageScores, ScoreReasons};
    use crate::providers::{ChatCompletion, ManagedBackend};
    use async_trait::async_trait;
    use std::sync::Arc;
    use uuid::Uuid;

    /// Backend returning a fixed completion body.
    struct CannedBackend(&'static str);

    #[async_trait]
    impl ManagedBackend for CannedBackend {
        async fn complete(&self, _messages: &[ChatMessage]) -> AgoraResult<ChatCompletion> {
            Ok(ChatCompletion {
                content: self.0.to_string(),
                usage: None,
            })
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl ManagedBackend for FailingBackend {
        async fn complete(&self, _messages: &[ChatMessage]) -> AgoraResult<ChatCompletion> {
            Err(AgoraError::Internal("provider down".to_string()))
        }
    }

    fn generator(backend: impl ManagedBackend + 'static) -> SummaryGenerator {
        SummaryGenerator::new(ChatClient::new(Arc::new(backend)))
    }

    fn transcript() -> Vec<Message> {
        vec![Message::broadcast(
            Uuid::new_v4(),
            "optimist",
            "Cities thrive without cars.",
            1,
        )]
    }

    fn roster() -> Vec<Agent> {
        vec![
            Agent::new("optimist", "The Optimist", "hopeful futurist", "p1"),
            Agent::new("skeptic", "The Skeptic", "cautious analyst", "p2"),
        ]
    }

    #[test]
    fn test_raw_summary_consensus_as_string() {
        let raw: RawSummary = serde_json::from_str(
            r#"{"summary":"s","keyPoints":["k"],"consensus":"we agree","disagreements":[]}"#,
        )
        .unwrap();
        assert_eq!(raw.consensus.into_string(), "we agree");
    }

    #[test]
    fn test_raw_summary_consensus_as_list_is_joined() {
        let raw: RawSummary = serde_json::from_str(
            r#"{"summary":"s","consensus":["point one","point two"]}"#,
        )
        .unwrap();
        assert_eq!(raw.consensus.into_string(), "point one; point two");
    }

    #[test]
    fn test_raw_summary_optional_fields() {
        let raw: RawSummary = serde_json::from_str(
            r#"{"summary":"s","bestArgument":"the cost argument","notableQuotes":["q1"]}"#,
        )
        .unwrap();
        assert_eq!(raw.best_argument.as_deref(), Some("the cost argument"));
        assert!(raw.most_innovative.is_none());
        assert_eq!(raw.notable_quotes, vec!["q1"]);
    }

    #[test]
    fn test_build_prompt_contains_transcript_and_roster() {
        let agents = roster();
        let session_id = Uuid::new_v4();
        let messages = vec![
            Message::broadcast(session_id, "optimist", "Cities thrive without cars.", 1),
            Message::broadcast(session_id, "skeptic", "Logistics disagree.", 1),
        ];

        let prompt = build_prompt("Should cities ban cars?", &agents, &messages, 5);

        assert!(prompt.contains("Should cities ban cars?"));
        assert!(prompt.contains("- The Optimist: hopeful futurist"));
        assert!(prompt.contains("**The Skeptic** (Round 1)"));
        assert!(prompt.contains("\"keyPoints\""));
        // No scored messages, so no excerpt block.
        assert!(!prompt.contains("HIGHEST-SCORED STATEMENTS"));
    }

    #[test]
    fn test_build_prompt_includes_top_excerpts() {
        let agents = roster();
        let session_id = Uuid::new_v4();
        let mut scored = Message::broadcast(session_id, "optimist", "Strong point.", 1);
        scored.scores = Some(MessageScores::new(9, 8, 9, ScoreReasons::default()));
        let messages = vec![
            scored,
            Message::broadcast(session_id, "skeptic", "Unscored point.", 1),
        ];

        let prompt = build_prompt("topic", &agents, &messages, 5);
        assert!(prompt.contains("HIGHEST-SCORED STATEMENTS"));
        assert!(prompt.contains("The Optimist (score 26)"));
    }

    #[tokio::test]
    async fn test_generate_empty_transcript_short_circuits_to_placeholder() {
        // A failing backend proves no LLM call is made.
        let generator = generator(FailingBackend);
        let summary = generator
            .generate("topic", &roster(), &[], &ProviderConfig::managed(), 5)
            .await;
        assert!(summary.is_placeholder());
    }

    #[tokio::test]
    async fn test_generate_provider_failure_degrades_to_placeholder() {
        let generator = generator(FailingBackend);
        let summary = generator
            .generate("topic", &roster(), &transcript(), &ProviderConfig::managed(), 5)
            .await;
        assert!(summary.is_placeholder());
    }

    #[tokio::test]
    async fn test_generate_unparsable_output_degrades_to_placeholder() {
        let generator = generator(CannedBackend("the debate was very interesting"));
        let summary = generator
            .generate("topic", &roster(), &transcript(), &ProviderConfig::managed(), 5)
            .await;
        assert!(summary.is_placeholder());
    }

    #[tokio::test]
    async fn test_generate_empty_completion_degrades_to_placeholder() {
        let generator = generator(CannedBackend(""));
        let summary = generator
            .generate("topic", &roster(), &transcript(), &ProviderConfig::managed(), 5)
            .await;
        assert!(summary.is_placeholder());
    }

    #[tokio::test]
    async fn test_generate_parses_fenced_output() {
        let generator = generator(CannedBackend(
            "```json\n{\"summary\":\"A good debate.\",\"keyPoints\":[\"k1\"],\"consensus\":\"agree\"}\n```",
        ));
        let summary = generator
            .generate("topic", &roster(), &transcript(), &ProviderConfig::managed(), 5)
            .await;
        assert!(!summary.is_placeholder());
        assert_eq!(summary.summary, "A good debate.");
        assert_eq!(summary.key_points, vec!["k1"]);
        assert_eq!(summary.consensus, "agree");
    }

    #[test]
    fn test_top_excerpts_order_and_truncation() {
        let session_id = Uuid::new_v4();
        let mut messages = Vec::new();
        for i in 1..=8u8 {
            let mut m = Message::broadcast(session_id, "a", format!("m{}", i), 1);
            m.scores = Some(MessageScores::new(i, 0, 1, ScoreReasons::default()));
            messages.push(m);
        }

        let excerpts = top_excerpts(&messages, 5);
        assert_eq!(excerpts.len(), 5);
        assert_eq!(excerpts[0].total_score(), 9);
        assert_eq!(excerpts[4].total_score(), 5);
    }
}
