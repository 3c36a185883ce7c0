use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use agora_core::{
    select_highlights, Agent, AgoraResult, ChatClient, ChatCompletion, ChatMessage, ManagedBackend,
    MemoryStore, Message, MessageScores, MessageStore, ScoreReasons, ScoringPipeline,
    EXPRESSION_SCORER_ID, INNOVATION_SCORER_ID, LOGIC_SCORER_ID,
};

/// Answers each scorer differently, keyed on a marker in its system prompt.
struct PerScorerBackend;

#[async_trait]
impl ManagedBackend for PerScorerBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> AgoraResult<ChatCompletion> {
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        let content = if system.contains("LOGIC") {
            "this is not json at all".to_string()
        } else if system.contains("INNOVATION") {
            r#"{"score": 9, "reason": "fresh angle"}"#.to_string()
        } else {
            "```json\n{\"score\": 42, \"reason\": \"over the top\"}\n```".to_string()
        };
        Ok(ChatCompletion {
            content,
            usage: None,
        })
    }
}

struct FixedVerdictBackend;

#[async_trait]
impl ManagedBackend for FixedVerdictBackend {
    async fn complete(&self, _messages: &[ChatMessage]) -> AgoraResult<ChatCompletion> {
        Ok(ChatCompletion {
            content: r#"{"score": 6, "reason": "fine"}"#.to_string(),
            usage: None,
        })
    }
}

async fn seed_scorers(store: &MemoryStore) {
    store
        .insert_agent(Agent::new(
            LOGIC_SCORER_ID,
            "Logic Scorer",
            "judge",
            "LOGIC: rate the reasoning as a JSON verdict.",
        ))
        .await;
    store
        .insert_agent(Agent::new(
            INNOVATION_SCORER_ID,
            "Innovation Scorer",
            "judge",
            "INNOVATION: rate the originality as a JSON verdict.",
        ))
        .await;
    store
        .insert_agent(Agent::new(
            EXPRESSION_SCORER_ID,
            "Expression Scorer",
            "judge",
            "EXPRESSION: rate the delivery as a JSON verdict.",
        ))
        .await;
}

fn pipeline(store: &Arc<MemoryStore>, backend: Arc<dyn ManagedBackend>) -> ScoringPipeline {
    ScoringPipeline::new(
        store.clone(),
        store.clone(),
        store.clone(),
        ChatClient::new(backend),
        5,
    )
}

#[tokio::test]
async fn missing_scorer_personas_yield_neutral_annotation() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&store, Arc::new(FixedVerdictBackend));

    let message = Message::broadcast(Uuid::new_v4(), "optimist", "An argument.", 1);
    let scores = pipeline.score_message(&message, "topic", &[], 1).await;

    assert_eq!(scores.logic, 5);
    assert_eq!(scores.innovation, 5);
    assert_eq!(scores.expression, 5);
    assert_eq!(scores.total, 15);
    assert_eq!(scores.reasons.logic, "scorer not initialized");
}

#[tokio::test]
async fn dimensions_fall_back_independently() {
    let store = Arc::new(MemoryStore::new());
    seed_scorers(&store).await;
    let pipeline = pipeline(&store, Arc::new(PerScorerBackend));

    let message = Message::broadcast(Uuid::new_v4(), "optimist", "An argument.", 1);
    let scores = pipeline.score_message(&message, "topic", &[], 1).await;

    // Logic verdict was unparsable, innovation parsed, expression clamped.
    assert_eq!(scores.logic, 5);
    assert_eq!(scores.reasons.logic, "score parse failed");
    assert_eq!(scores.innovation, 9);
    assert_eq!(scores.reasons.innovation, "fresh angle");
    assert_eq!(scores.expression, 10);
    assert_eq!(scores.reasons.expression, "over the top");
    assert_eq!(scores.total, 24);
}

#[tokio::test]
async fn spawned_scoring_persists_annotation() {
    let store = Arc::new(MemoryStore::new());
    seed_scorers(&store).await;
    let pipeline = Arc::new(pipeline(&store, Arc::new(FixedVerdictBackend)));

    let session_id = Uuid::new_v4();
    let message = Message::broadcast(session_id, "optimist", "An argument.", 1);
    store.create_message(&message).await.unwrap();

    let handle = pipeline.spawn_score(message.clone(), "topic".to_string(), Vec::new(), 1);
    handle.await.unwrap();

    let stored = store.list_messages(session_id).await.unwrap();
    let scores = stored[0].scores.as_ref().unwrap();
    assert_eq!(scores.total, 18);
    assert_eq!(scores.reasons.expression, "fine");
    assert!(!scores.highlight);
}

#[tokio::test]
async fn mark_highlights_flags_top_messages() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&store, Arc::new(FixedVerdictBackend));

    let session_id = Uuid::new_v4();
    let mut ids = Vec::new();
    for i in 1..=6u8 {
        let message = Message::broadcast(session_id, "a", format!("m{}", i), 1);
        ids.push(message.id);
        store.create_message(&message).await.unwrap();
        store
            .update_scores(
                message.id,
                &MessageScores::new(i, i, i, ScoreReasons::default()),
            )
            .await
            .unwrap();
    }

    let highlights = pipeline.mark_highlights(session_id).await.unwrap();
    // max(3, ceil(6 * 0.2)) = 3, highest totals first.
    assert_eq!(highlights, vec![ids[5], ids[4], ids[3]]);

    let stored = store.list_messages(session_id).await.unwrap();
    for message in &stored {
        let flagged = message.scores.as_ref().unwrap().highlight;
        assert_eq!(flagged, highlights.contains(&message.id));
    }
}

#[tokio::test]
async fn highlights_ignore_unscored_messages() {
    let session_id = Uuid::new_v4();
    let mut messages = Vec::new();
    for i in 1..=4u8 {
        let mut m = Message::broadcast(session_id, "a", "text", 1);
        m.scores = Some(MessageScores::new(i, 0, 0, ScoreReasons::default()));
        messages.push(m);
    }
    messages.push(Message::broadcast(session_id, "b", "unscored", 1));

    let highlights = select_highlights(&messages);
    assert_eq!(highlights.len(), 3);
    assert!(!highlights.contains(&messages.last().unwrap().id));
}
