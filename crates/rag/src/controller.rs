//! Conversation controller: runs one turn through the pipeline.
//!
//! ```text
//! Idle -> AwaitingQuery -> [RewritingQuery] -> Retrieving -> GatingRelevance
//!      -> Synthesizing | Fallback -> Idle
//! ```
//!
//! With retrieval disabled a turn goes straight from `AwaitingQuery` to
//! `Synthesizing`. Failures in any stage become a tagged error result; the
//! turn log always receives both the question and a reply.

use crate::conversation::{ConversationState, SessionSettings, Turn};
use crate::fusion;
use crate::gate::{RelevanceGate, DEFAULT_THRESHOLD};
use crate::judge::Judge;
use crate::retrieval::{Retriever, DEFAULT_LIMIT};
use crate::synthesis;
use crate::types::{ContextBundle, RelevanceVerdict, RetrievedPassage};
use ragchat_core::{AppError, AppResult, ErrorKind};
use ragchat_llm::LlmClient;
use ragchat_prompt::PromptLibrary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reply given when the retrieved context is not relevant enough.
pub const NO_INFORMATION: &str = "I don't have the information to answer your question";

/// Prefix of the reply shown for a failed turn.
pub const ERROR_PREFIX: &str = "Error: ";

/// Pipeline stage of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    AwaitingQuery,
    RewritingQuery,
    Retrieving,
    GatingRelevance,
    Synthesizing,
    Fallback,
}

impl TurnPhase {
    /// Whether the pipeline may move from `self` to `next`.
    ///
    /// Every non-idle phase may return to `Idle`, which is how a failed turn
    /// ends.
    pub fn can_transition_to(self, next: TurnPhase) -> bool {
        use TurnPhase::*;

        if next == Idle {
            return self != Idle;
        }

        matches!(
            (self, next),
            (Idle, AwaitingQuery)
                | (AwaitingQuery, RewritingQuery)
                | (AwaitingQuery, Retrieving)
                | (AwaitingQuery, Synthesizing)
                | (RewritingQuery, Retrieving)
                | (Retrieving, GatingRelevance)
                | (GatingRelevance, Synthesizing)
                | (GatingRelevance, Fallback)
        )
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingQuery => "awaiting_query",
            Self::RewritingQuery => "rewriting_query",
            Self::Retrieving => "retrieving",
            Self::GatingRelevance => "gating_relevance",
            Self::Synthesizing => "synthesizing",
            Self::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// How a successful reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Synthesized from retrieved context
    Answered,
    /// Context judged irrelevant; fixed fallback text
    NoInformation,
    /// Retrieval disabled; answered by the model alone
    Direct,
}

/// A successful turn result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReply {
    pub text: String,

    /// Distinct source paths of the passages the answer was drawn from
    pub citations: Vec<String>,

    pub kind: ReplyKind,
}

impl TurnReply {
    pub fn no_information() -> Self {
        Self {
            text: NO_INFORMATION.to_string(),
            citations: Vec::new(),
            kind: ReplyKind::NoInformation,
        }
    }
}

/// A failed turn result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<AppError> for TurnFailure {
    fn from(err: AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// What happened during a turn, for debugging and evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnTrace {
    pub phases: Vec<TurnPhase>,

    /// Query sent to the retriever, after any rewrite
    pub retrieval_query: Option<String>,

    pub verdict: Option<RelevanceVerdict>,
    pub passages: Vec<RetrievedPassage>,
}

impl TurnTrace {
    fn new() -> Self {
        Self {
            phases: vec![TurnPhase::Idle],
            ..Default::default()
        }
    }

    /// The phase the turn is in.
    pub fn current(&self) -> TurnPhase {
        self.phases.last().copied().unwrap_or(TurnPhase::Idle)
    }

    fn enter(&mut self, next: TurnPhase) {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::warn!("Unexpected turn transition {} -> {}", current, next);
        }
        tracing::debug!(phase = %next, "Turn phase");
        self.phases.push(next);
    }

    /// Whether the turn passed through `phase`.
    pub fn visited(&self, phase: TurnPhase) -> bool {
        self.phases.contains(&phase)
    }
}

/// The result of one turn plus its trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub result: Result<TurnReply, TurnFailure>,
    pub trace: TurnTrace,
}

impl TurnOutcome {
    /// The text shown to the user and recorded as the assistant turn.
    pub fn display_text(&self) -> String {
        match &self.result {
            Ok(reply) => reply.text.clone(),
            Err(failure) => format!("{}{}", ERROR_PREFIX, failure.message),
        }
    }

    /// Citations of a successful turn; `None` for a failed one.
    pub fn citations(&self) -> Option<&[String]> {
        self.result.as_ref().ok().map(|reply| reply.citations.as_slice())
    }

    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }
}

/// Tunables for the controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Passages requested per search
    pub retrieval_limit: usize,

    /// Relevance gate threshold
    pub threshold: f32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            retrieval_limit: DEFAULT_LIMIT,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Orchestrates rewrite, retrieval, gating and synthesis for each turn.
///
/// Holds no conversation state of its own; the caller passes the session's
/// [`ConversationState`] into every call.
pub struct ConversationController {
    retriever: Arc<dyn Retriever>,
    client: Arc<dyn LlmClient>,
    gate: RelevanceGate,
    prompts: Arc<PromptLibrary>,
    retrieval_limit: usize,
}

impl ConversationController {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        client: Arc<dyn LlmClient>,
        judge: Arc<dyn Judge>,
        prompts: Arc<PromptLibrary>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            retriever,
            client,
            gate: RelevanceGate::new(judge, options.threshold),
            prompts,
            retrieval_limit: options.retrieval_limit,
        }
    }

    /// Run one turn for `question`.
    ///
    /// Appends the question to the log, runs the pipeline against a snapshot
    /// of the session settings, then appends the reply (or the error text).
    pub async fn submit(&self, state: &mut ConversationState, question: &str) -> TurnOutcome {
        let settings = state.settings.clone();
        let mut trace = TurnTrace::new();
        trace.enter(TurnPhase::AwaitingQuery);

        state.push(Turn::user(question));
        let history = state.chat_history().to_vec();

        let result = self
            .run_pipeline(question, &history, &settings, &mut trace)
            .await
            .map_err(|e| {
                tracing::warn!("Turn failed: {}", e);
                TurnFailure::from(e)
            });

        trace.enter(TurnPhase::Idle);
        let outcome = TurnOutcome { result, trace };
        state.push(Turn::assistant(outcome.display_text()));

        tracing::debug!(
            session = %state.session_id(),
            turns = state.len(),
            error = outcome.is_error(),
            "Turn complete"
        );
        outcome
    }

    /// Clear the conversation log.
    pub fn reset(&self, state: &mut ConversationState) {
        state.reset();
    }

    async fn run_pipeline(
        &self,
        question: &str,
        history: &[Turn],
        settings: &SessionSettings,
        trace: &mut TurnTrace,
    ) -> AppResult<TurnReply> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidInput("Question is empty".to_string()));
        }

        if !settings.use_retrieval {
            trace.enter(TurnPhase::Synthesizing);
            let text = synthesis::answer_directly(
                self.client.as_ref(),
                &self.prompts,
                settings.model,
                question,
            )
            .await?;
            return Ok(TurnReply {
                text,
                citations: Vec::new(),
                kind: ReplyKind::Direct,
            });
        }

        let query = if settings.use_history && !history.is_empty() {
            trace.enter(TurnPhase::RewritingQuery);
            fusion::rewrite_query(
                self.client.as_ref(),
                &self.prompts,
                settings.model,
                history,
                question,
            )
            .await?
        } else {
            question.to_string()
        };
        trace.retrieval_query = Some(query.clone());

        trace.enter(TurnPhase::Retrieving);
        let filter = settings.category.to_search_filter();
        let passages = self
            .retriever
            .search(&query, filter.as_ref(), self.retrieval_limit)
            .await?;
        tracing::info!(
            passages = passages.len(),
            category = %settings.category,
            "Retrieved context"
        );
        let bundle = ContextBundle::new(query.clone(), settings.category.clone(), passages);
        trace.passages = bundle.passages().to_vec();

        trace.enter(TurnPhase::GatingRelevance);
        let verdict = self.gate.score(&bundle, &query).await?;
        let accepted = verdict.accepted;
        trace.verdict = Some(verdict);

        if !accepted {
            trace.enter(TurnPhase::Fallback);
            return Ok(TurnReply::no_information());
        }

        trace.enter(TurnPhase::Synthesizing);
        let text = synthesis::answer(
            self.client.as_ref(),
            &self.prompts,
            settings.model,
            &query,
            &bundle,
        )
        .await?;

        Ok(TurnReply {
            text,
            citations: bundle.source_paths(),
            kind: ReplyKind::Answered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use TurnPhase::*;

        assert!(Idle.can_transition_to(AwaitingQuery));
        assert!(AwaitingQuery.can_transition_to(RewritingQuery));
        assert!(AwaitingQuery.can_transition_to(Synthesizing));
        assert!(GatingRelevance.can_transition_to(Fallback));
        assert!(Retrieving.can_transition_to(Idle));

        assert!(!Idle.can_transition_to(Idle));
        assert!(!Idle.can_transition_to(Retrieving));
        assert!(!Fallback.can_transition_to(Synthesizing));
        assert!(!RewritingQuery.can_transition_to(GatingRelevance));
    }

    #[test]
    fn test_failure_display_text() {
        let outcome = TurnOutcome {
            result: Err(TurnFailure::from(AppError::CompletionUnavailable(
                "503".to_string(),
            ))),
            trace: TurnTrace::new(),
        };

        assert_eq!(outcome.display_text(), "Error: Completion unavailable: 503");
        assert!(outcome.citations().is_none());
    }

    #[test]
    fn test_no_information_reply() {
        let reply = TurnReply::no_information();
        assert_eq!(reply.text, "I don't have the information to answer your question");
        assert!(reply.citations.is_empty());
        assert_eq!(reply.kind, ReplyKind::NoInformation);
    }
}
