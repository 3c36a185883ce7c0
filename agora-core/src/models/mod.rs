pub mod agent;
pub mod message;
pub mod session;

pub use agent::{Agent, AgentStatus};
pub use message::{Message, MessageScores, ScoreReasons, Sentiment, BROADCAST_RECEIVER};
pub use session::{DebateSession, DebateSummary, SessionStatus};
