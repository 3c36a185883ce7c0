//! Agora core: a multi-agent debate orchestration engine.
//!
//! A fixed roster of AI personas takes turns arguing a topic over several
//! rounds while a detached scoring pipeline annotates each utterance and a
//! final pass synthesizes a structured summary. Storage, auth, and
//! transport are external collaborators consumed through the [`repo`]
//! traits; observers watch live through the [`events`] broadcast contract.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod providers;
pub mod repo;
pub mod scoring;
pub mod summary;

pub use config::{init_tracing, AgoraConfig, ConfigLoadError, EngineConfig, LoggingConfig, ProviderDefaults};
pub use engine::{DebateEngine, DebateHub};
pub use error::{AgoraError, AgoraResult};
pub use events::{DebateEvent, EventBus};
pub use models::{
    Agent, AgentStatus, DebateSession, DebateSummary, Message, MessageScores, ScoreReasons,
    Sentiment, SessionStatus, BROADCAST_RECEIVER,
};
pub use providers::{
    ChatClient, ChatCompletion, ChatMessage, HttpManagedBackend, ManagedBackend, ProviderConfig,
    ProviderKind, Role, TokenUsage,
};
pub use repo::{AgentStore, MemoryStore, MessageStore, ProviderStore, SessionStore};
pub use scoring::{
    select_highlights, ScoreResult, ScoringPipeline, EXPRESSION_SCORER_ID, INNOVATION_SCORER_ID,
    LOGIC_SCORER_ID,
};
pub use summary::SummaryGenerator;
