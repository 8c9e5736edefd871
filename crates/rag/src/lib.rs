//! Retrieval-augmented chat over a document corpus.
//!
//! A turn flows through the [`ConversationController`]:
//! optional query rewrite from chat history, retrieval from the search
//! service, relevance gating, then grounded answer synthesis. The
//! [`evaluation`] module replays a question set through the same pipeline
//! and scores it with an LLM judge.

pub mod controller;
pub mod conversation;
pub mod evaluation;
pub mod fusion;
pub mod gate;
pub mod judge;
pub mod retrieval;
pub mod synthesis;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use controller::{
    ControllerOptions, ConversationController, ReplyKind, TurnFailure, TurnOutcome, TurnPhase,
    TurnReply, TurnTrace, NO_INFORMATION,
};
pub use conversation::{ConversationState, Role, SessionSettings, Turn};
pub use evaluation::{
    EvaluationLog, EvaluationRecord, EvaluationReport, Evaluator, Leaderboard, DEFAULT_QUESTIONS,
};
pub use gate::RelevanceGate;
pub use judge::{FeedbackProvider, Judge, LlmJudge};
pub use retrieval::{CortexSearchRetriever, Retriever};
pub use types::{CategoryFilter, ContextBundle, RelevanceVerdict, RetrievedPassage, SearchFilter};
