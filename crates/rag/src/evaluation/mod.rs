//! Offline quality scoring of the chat pipeline.
//!
//! Each question runs as a fresh single-turn conversation; the reply is then
//! scored for groundedness, context relevance and answer relevance by a
//! [`FeedbackProvider`].

pub mod log;

pub use log::EvaluationLog;

use crate::controller::{ConversationController, TurnFailure};
use crate::conversation::{ConversationState, SessionSettings};
use crate::judge::FeedbackProvider;
use crate::types::CategoryFilter;
use chrono::{DateTime, Utc};
use ragchat_core::AppResult;
use ragchat_llm::ModelName;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub const DEFAULT_APP_NAME: &str = "RAG";
pub const DEFAULT_APP_VERSION: &str = "simple";

/// Questions about the Rust book used when no set is supplied.
pub const DEFAULT_QUESTIONS: [&str; 8] = [
    "How can I define a library in Rust and use it inside an executable?",
    "Can I have a library and an executable inside a rust package?",
    "What is the difference between packages and crates?",
    "How can I write both unit tests and integrations tests in Rust?",
    "How can I ignore a test?",
    "What is ownership in Rust?",
    "How can I parse a CLI command?",
    "How can I write a CLI tool? Are there any libraries I can use to help me do this?",
];

/// Scores and timing for one evaluated question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub record_id: Uuid,
    pub app_name: String,
    pub app_version: String,
    pub question: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    #[serde(default)]
    pub citations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundedness: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_relevance: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_relevance: Option<f32>,

    pub latency_ms: u64,

    /// Set when the turn itself failed; such records carry no scores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TurnFailure>,

    pub recorded_at: DateTime<Utc>,
}

/// Aggregate scores for one app version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub app_name: String,
    pub app_version: String,
    pub records: usize,
    pub errors: usize,
    pub groundedness: Option<f32>,
    pub context_relevance: Option<f32>,
    pub answer_relevance: Option<f32>,
    pub mean_latency_ms: Option<f64>,
}

impl Leaderboard {
    /// Average each metric over the records that carry it.
    pub fn from_records(app_name: &str, app_version: &str, records: &[EvaluationRecord]) -> Self {
        let mean = |metric: fn(&EvaluationRecord) -> Option<f32>| {
            let values: Vec<f32> = records.iter().filter_map(metric).collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f32>() / values.len() as f32)
            }
        };

        let mean_latency_ms = if records.is_empty() {
            None
        } else {
            Some(records.iter().map(|r| r.latency_ms as f64).sum::<f64>() / records.len() as f64)
        };

        Self {
            app_name: app_name.to_string(),
            app_version: app_version.to_string(),
            records: records.len(),
            errors: records.iter().filter(|r| r.error.is_some()).count(),
            groundedness: mean(|r| r.groundedness),
            context_relevance: mean(|r| r.context_relevance),
            answer_relevance: mean(|r| r.answer_relevance),
            mean_latency_ms,
        }
    }
}

/// Result of an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub records: Vec<EvaluationRecord>,
    pub leaderboard: Leaderboard,
}

/// Replays questions through the controller and scores the replies.
pub struct Evaluator {
    controller: Arc<ConversationController>,
    feedback: Arc<dyn FeedbackProvider>,
    model: ModelName,
    app_name: String,
    app_version: String,
}

impl Evaluator {
    pub fn new(
        controller: Arc<ConversationController>,
        feedback: Arc<dyn FeedbackProvider>,
        model: ModelName,
    ) -> Self {
        Self {
            controller,
            feedback,
            model,
            app_name: DEFAULT_APP_NAME.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
        }
    }

    /// Label the records this evaluator produces.
    pub fn with_app(mut self, app_name: impl Into<String>, app_version: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self.app_version = app_version.into();
        self
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Evaluate every question in order.
    pub async fn run(&self, questions: &[String]) -> AppResult<EvaluationReport> {
        tracing::info!(
            app = %self.app_name,
            version = %self.app_version,
            questions = questions.len(),
            "Starting evaluation"
        );

        let mut records = Vec::with_capacity(questions.len());
        for question in questions {
            records.push(self.evaluate(question).await);
        }

        let leaderboard = Leaderboard::from_records(&self.app_name, &self.app_version, &records);
        tracing::info!(
            records = leaderboard.records,
            errors = leaderboard.errors,
            "Evaluation complete"
        );

        Ok(EvaluationReport {
            records,
            leaderboard,
        })
    }

    async fn evaluate(&self, question: &str) -> EvaluationRecord {
        let settings = SessionSettings {
            model: self.model,
            category: CategoryFilter::All,
            use_history: false,
            use_retrieval: true,
            debug: false,
        };
        let mut state = ConversationState::new(0, settings);

        let start = Instant::now();
        let outcome = self.controller.submit(&mut state, question).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let mut record = EvaluationRecord {
            record_id: Uuid::new_v4(),
            app_name: self.app_name.clone(),
            app_version: self.app_version.clone(),
            question: question.to_string(),
            answer: None,
            citations: Vec::new(),
            groundedness: None,
            context_relevance: None,
            answer_relevance: None,
            latency_ms,
            error: None,
            recorded_at: Utc::now(),
        };

        let reply = match outcome.result {
            Ok(reply) => reply,
            Err(failure) => {
                tracing::warn!("Evaluation turn failed for {:?}: {}", question, failure.message);
                record.error = Some(failure);
                return record;
            }
        };

        let context = outcome
            .trace
            .passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        record.context_relevance = outcome.trace.verdict.as_ref().map(|v| v.score);

        let groundedness = async {
            if context.is_empty() {
                None
            } else {
                score_or_warn(
                    "groundedness",
                    self.feedback.groundedness(&context, &reply.text).await,
                )
            }
        };
        let answer_relevance = async {
            score_or_warn(
                "answer relevance",
                self.feedback.answer_relevance(question, &reply.text).await,
            )
        };
        let (groundedness, answer_relevance) = tokio::join!(groundedness, answer_relevance);

        record.groundedness = groundedness;
        record.answer_relevance = answer_relevance;
        record.answer = Some(reply.text);
        record.citations = reply.citations;
        record
    }
}

fn score_or_warn(metric: &str, score: AppResult<f32>) -> Option<f32> {
    match score {
        Ok(score) => Some(score),
        Err(e) => {
            tracing::warn!("Failed to score {}: {}", metric, e);
            None
        }
    }
}
