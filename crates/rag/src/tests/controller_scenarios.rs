//! End-to-end turns through the controller.

use super::fakes::{controller, passage, CallKind, FakeRetriever, FixedJudge, ScriptedLlm};
use crate::controller::{ReplyKind, TurnPhase, NO_INFORMATION};
use crate::conversation::{ConversationState, Role, SessionSettings};
use crate::types::{CategoryFilter, SearchFilter};
use ragchat_core::ErrorKind;
use std::sync::Arc;

fn rust_book_passages() -> Vec<crate::types::RetrievedPassage> {
    vec![
        passage(
            "Ownership is a set of rules that govern how a Rust program manages memory.",
            "ch04-01-what-is-ownership.md",
        ),
        passage(
            "Each value in Rust has an owner.",
            "ch04-01-what-is-ownership.md",
        ),
        passage(
            "References allow you to refer to a value without taking ownership.",
            "ch04-02-references-and-borrowing.md",
        ),
    ]
}

fn state() -> ConversationState {
    ConversationState::new(7, SessionSettings::default())
}

#[tokio::test]
async fn test_relevant_context_is_synthesized_with_citations() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let llm = Arc::new(ScriptedLlm::new().with_answer("Ownership governs memory."));
    let judge = FixedJudge::scoring(0.8);
    let controller = controller(retriever.clone(), llm.clone(), judge.clone());
    let mut state = state();

    let outcome = controller.submit(&mut state, "What is ownership in Rust?").await;

    let reply = outcome.result.as_ref().unwrap();
    assert_eq!(reply.text, "Ownership governs memory.");
    assert_eq!(reply.kind, ReplyKind::Answered);
    assert_eq!(
        reply.citations,
        vec![
            "ch04-01-what-is-ownership.md",
            "ch04-02-references-and-borrowing.md"
        ]
    );

    // Empty history: no rewrite, raw question goes to retrieval
    assert!(llm.calls_of(CallKind::Rewrite).is_empty());
    assert_eq!(retriever.calls()[0].query, "What is ownership in Rust?");
    assert_eq!(judge.relevance_calls(), 3);

    let verdict = outcome.trace.verdict.as_ref().unwrap();
    assert!((verdict.score - 0.8).abs() < 1e-6);
    assert_eq!(
        outcome.trace.phases,
        vec![
            TurnPhase::Idle,
            TurnPhase::AwaitingQuery,
            TurnPhase::Retrieving,
            TurnPhase::GatingRelevance,
            TurnPhase::Synthesizing,
            TurnPhase::Idle,
        ]
    );

    let answer_prompt = &llm.calls_of(CallKind::Answer)[0];
    assert!(answer_prompt.contains("[Passage 3] (ch04-02-references-and-borrowing.md)"));
}

#[tokio::test]
async fn test_no_passages_gives_verbatim_fallback() {
    let retriever = FakeRetriever::returning(Vec::new());
    let llm = Arc::new(ScriptedLlm::new());
    let judge = FixedJudge::scoring(1.0);
    let controller = controller(retriever, llm.clone(), judge.clone());
    let mut state = state();

    let outcome = controller.submit(&mut state, "What is a monad?").await;

    let reply = outcome.result.as_ref().unwrap();
    assert_eq!(reply.text, "I don't have the information to answer your question");
    assert_eq!(reply.text, NO_INFORMATION);
    assert!(reply.citations.is_empty());
    assert_eq!(reply.kind, ReplyKind::NoInformation);

    assert_eq!(judge.relevance_calls(), 0);
    assert!(llm.calls_of(CallKind::Answer).is_empty());
    assert!(outcome.trace.visited(TurnPhase::Fallback));
    assert!(!outcome.trace.visited(TurnPhase::Synthesizing));
}

#[tokio::test]
async fn test_zero_relevance_gives_fallback_without_synthesis() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let llm = Arc::new(ScriptedLlm::new());
    let controller = controller(retriever, llm.clone(), FixedJudge::scoring(0.0));
    let mut state = state();

    let outcome = controller.submit(&mut state, "How do I bake bread?").await;

    assert_eq!(outcome.display_text(), NO_INFORMATION);
    assert_eq!(outcome.citations(), Some(&[][..]));
    assert!(llm.calls_of(CallKind::Answer).is_empty());
    assert_eq!(outcome.trace.verdict.as_ref().unwrap().score, 0.0);
}

#[tokio::test]
async fn test_follow_up_is_rewritten_once_and_rewrite_is_retrieved() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let llm = Arc::new(
        ScriptedLlm::new().with_rewrite("\"How do references relate to ownership in Rust?\""),
    );
    let controller = controller(retriever.clone(), llm.clone(), FixedJudge::scoring(1.0));
    let mut state = state();

    controller.submit(&mut state, "What is ownership in Rust?").await;
    assert_eq!(state.len(), 2);

    let outcome = controller.submit(&mut state, "And references?").await;

    let rewrites = llm.calls_of(CallKind::Rewrite);
    assert_eq!(rewrites.len(), 1);
    assert!(rewrites[0].contains("user: What is ownership in Rust?"));
    assert!(rewrites[0].contains("assistant: synthesized answer"));
    assert!(!rewrites[0].contains("user: And references?\n"));

    let calls = retriever.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].query, "How do references relate to ownership in Rust?");
    assert_ne!(calls[1].query, "And references?");
    assert_eq!(
        outcome.trace.retrieval_query.as_deref(),
        Some("How do references relate to ownership in Rust?")
    );
    assert!(outcome.trace.visited(TurnPhase::RewritingQuery));
}

#[tokio::test]
async fn test_history_disabled_skips_rewrite() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let llm = Arc::new(ScriptedLlm::new());
    let controller = controller(retriever.clone(), llm.clone(), FixedJudge::scoring(1.0));
    let mut state = state();
    state.settings.use_history = false;

    controller.submit(&mut state, "What is ownership in Rust?").await;
    controller.submit(&mut state, "And references?").await;

    assert!(llm.calls_of(CallKind::Rewrite).is_empty());
    assert_eq!(retriever.calls()[1].query, "And references?");
}

#[tokio::test]
async fn test_empty_rewrite_falls_back_to_question() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let llm = Arc::new(ScriptedLlm::new().with_rewrite("  ''  "));
    let controller = controller(retriever.clone(), llm, FixedJudge::scoring(1.0));
    let mut state = state();

    controller.submit(&mut state, "What is ownership in Rust?").await;
    controller.submit(&mut state, "And borrowing?").await;

    assert_eq!(retriever.calls()[1].query, "And borrowing?");
}

#[tokio::test]
async fn test_synthesis_failure_is_reported_and_recorded() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let llm = Arc::new(ScriptedLlm::new().failing_answers());
    let controller = controller(retriever, llm, FixedJudge::scoring(1.0));
    let mut state = state();

    let outcome = controller.submit(&mut state, "What is ownership in Rust?").await;

    assert!(outcome.display_text().starts_with("Error: "));
    assert!(outcome.citations().is_none());
    let failure = outcome.result.as_ref().unwrap_err();
    assert_eq!(failure.kind, ErrorKind::CompletionUnavailable);

    assert_eq!(state.len(), 2);
    assert_eq!(state.turns()[0].role, Role::User);
    assert_eq!(state.turns()[1].role, Role::Assistant);
    assert!(state.turns()[1].content.starts_with("Error: "));
}

#[tokio::test]
async fn test_retrieval_failure_is_reported() {
    let llm = Arc::new(ScriptedLlm::new());
    let controller = controller(
        FakeRetriever::unavailable(),
        llm.clone(),
        FixedJudge::scoring(1.0),
    );
    let mut state = state();

    let outcome = controller.submit(&mut state, "What is ownership in Rust?").await;

    assert_eq!(
        outcome.result.as_ref().unwrap_err().kind,
        ErrorKind::RetrievalUnavailable
    );
    assert!(outcome.display_text().starts_with("Error: "));
    assert!(llm.calls_of(CallKind::Answer).is_empty());
    assert_eq!(outcome.trace.phases.last(), Some(&TurnPhase::Idle));
    assert_eq!(state.len(), 2);
}

#[tokio::test]
async fn test_rewrite_failure_stops_before_retrieval() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let llm = Arc::new(ScriptedLlm::new().failing_rewrites());
    let judge = FixedJudge::scoring(1.0);
    let controller = controller(retriever.clone(), llm.clone(), judge.clone());
    let mut state = state();

    controller.submit(&mut state, "What is ownership in Rust?").await;
    let outcome = controller.submit(&mut state, "And references?").await;

    let failure = outcome.result.as_ref().unwrap_err();
    assert_eq!(failure.kind, ErrorKind::CompletionUnavailable);
    assert!(outcome.display_text().starts_with("Error: "));
    assert!(outcome.display_text().contains("rewrite down"));
    assert!(outcome.citations().is_none());
    assert_eq!(state.len(), 4);
    assert!(state.turns()[3].content.starts_with("Error: "));

    // Only the first turn reached retrieval, gating and synthesis
    assert_eq!(retriever.calls().len(), 1);
    assert_eq!(judge.relevance_calls(), 3);
    assert_eq!(llm.calls_of(CallKind::Answer).len(), 1);
    assert!(outcome.trace.visited(TurnPhase::RewritingQuery));
    assert!(!outcome.trace.visited(TurnPhase::Retrieving));
    assert!(outcome.trace.retrieval_query.is_none());
}

#[tokio::test]
async fn test_judge_failure_stops_before_synthesis() {
    let llm = Arc::new(ScriptedLlm::new());
    let judge = FixedJudge::unreadable();
    let controller = controller(
        FakeRetriever::returning(rust_book_passages()),
        llm.clone(),
        judge.clone(),
    );
    let mut state = state();

    let outcome = controller.submit(&mut state, "What is ownership in Rust?").await;

    assert_eq!(outcome.result.as_ref().unwrap_err().kind, ErrorKind::Judge);
    assert!(outcome.display_text().starts_with("Error: "));
    assert!(outcome.citations().is_none());
    assert_eq!(state.len(), 2);

    assert!(judge.relevance_calls() >= 1);
    assert!(llm.calls_of(CallKind::Answer).is_empty());
    assert!(outcome.trace.visited(TurnPhase::GatingRelevance));
    assert!(outcome.trace.verdict.is_none());
    assert!(!outcome.trace.visited(TurnPhase::Synthesizing));
    assert!(!outcome.trace.visited(TurnPhase::Fallback));
}

#[tokio::test]
async fn test_malformed_search_result_is_reported() {
    let llm = Arc::new(ScriptedLlm::new());
    let judge = FixedJudge::scoring(1.0);
    let controller = controller(FakeRetriever::malformed(), llm.clone(), judge.clone());
    let mut state = state();

    let outcome = controller.submit(&mut state, "What is ownership in Rust?").await;

    assert_eq!(
        outcome.result.as_ref().unwrap_err().kind,
        ErrorKind::MalformedRetrievalResult
    );
    assert!(outcome.display_text().starts_with("Error: "));
    assert!(outcome.citations().is_none());
    assert_eq!(state.len(), 2);

    assert_eq!(judge.relevance_calls(), 0);
    assert!(llm.calls_of(CallKind::Answer).is_empty());
    assert!(!outcome.trace.visited(TurnPhase::GatingRelevance));
    assert_eq!(outcome.trace.phases.last(), Some(&TurnPhase::Idle));
}

#[tokio::test]
async fn test_blank_question_is_invalid_input() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let controller = controller(
        retriever.clone(),
        Arc::new(ScriptedLlm::new()),
        FixedJudge::scoring(1.0),
    );
    let mut state = state();

    let outcome = controller.submit(&mut state, "   ").await;

    assert_eq!(outcome.result.unwrap_err().kind, ErrorKind::InvalidInput);
    assert!(retriever.calls().is_empty());
    assert_eq!(state.len(), 2);
}

#[tokio::test]
async fn test_every_question_adds_two_turns() {
    let controller = controller(
        FakeRetriever::returning(rust_book_passages()),
        Arc::new(ScriptedLlm::new()),
        FixedJudge::scoring(0.5),
    );
    let mut state = state();

    for n in 1..=5 {
        controller.submit(&mut state, &format!("question {}", n)).await;
        assert_eq!(state.len(), 2 * n);
    }

    for (i, turn) in state.turns().iter().enumerate() {
        let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
        assert_eq!(turn.role, expected);
    }
}

#[tokio::test]
async fn test_category_all_sends_no_filter() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let controller = controller(
        retriever.clone(),
        Arc::new(ScriptedLlm::new()),
        FixedJudge::scoring(1.0),
    );
    let mut state = state();
    state.settings.category = CategoryFilter::parse("ALL");

    controller.submit(&mut state, "What is ownership in Rust?").await;

    let call = &retriever.calls()[0];
    assert!(call.filter.is_none());
    assert_eq!(call.limit, 5);
}

#[tokio::test]
async fn test_category_sends_equality_filter() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let controller = controller(
        retriever.clone(),
        Arc::new(ScriptedLlm::new()),
        FixedJudge::scoring(1.0),
    );
    let mut state = state();
    state.settings.category = CategoryFilter::parse("rust-book");

    controller.submit(&mut state, "What is ownership in Rust?").await;

    assert_eq!(
        retriever.calls()[0].filter,
        Some(SearchFilter::equals("category", "rust-book"))
    );
}

#[tokio::test]
async fn test_retrieval_disabled_answers_directly() {
    let retriever = FakeRetriever::returning(rust_book_passages());
    let llm = Arc::new(ScriptedLlm::new());
    let judge = FixedJudge::scoring(1.0);
    let controller = controller(retriever.clone(), llm.clone(), judge.clone());
    let mut state = state();
    state.settings.use_retrieval = false;

    let outcome = controller.submit(&mut state, "What is ownership in Rust?").await;

    let reply = outcome.result.as_ref().unwrap();
    assert_eq!(reply.kind, ReplyKind::Direct);
    assert_eq!(reply.text, "direct answer");
    assert!(reply.citations.is_empty());
    assert!(retriever.calls().is_empty());
    assert_eq!(judge.relevance_calls(), 0);
    assert_eq!(
        outcome.trace.phases,
        vec![
            TurnPhase::Idle,
            TurnPhase::AwaitingQuery,
            TurnPhase::Synthesizing,
            TurnPhase::Idle,
        ]
    );
}

#[tokio::test]
async fn test_reset_clears_log_and_history() {
    let llm = Arc::new(ScriptedLlm::new());
    let controller = controller(
        FakeRetriever::returning(rust_book_passages()),
        llm.clone(),
        FixedJudge::scoring(1.0),
    );
    let mut state = state();

    controller.submit(&mut state, "What is ownership in Rust?").await;
    controller.reset(&mut state);
    controller.reset(&mut state);
    assert_eq!(state.len(), 0);

    // First question after reset has no history to rewrite from
    controller.submit(&mut state, "And references?").await;
    assert!(llm.calls_of(CallKind::Rewrite).is_empty());
    assert_eq!(state.len(), 2);
}
