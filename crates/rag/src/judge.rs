//! LLM-as-judge scoring.
//!
//! The judge model answers with an integer on a 0-3 scale; scores are
//! normalized to [0, 1].

use async_trait::async_trait;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::{LlmClient, LlmRequest, ModelName};
use ragchat_prompt::templates::{ANSWER_RELEVANCE, CONTEXT_RELEVANCE, GROUNDEDNESS};
use ragchat_prompt::PromptLibrary;
use std::sync::Arc;

/// Top of the judge's rating scale.
const MAX_RATING: f32 = 3.0;

/// Scores how relevant a context is to a query.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Relevance of `context` to `query`, in [0, 1].
    async fn relevance(&self, context: &str, query: &str) -> AppResult<f32>;
}

/// The full feedback set used for offline evaluation.
#[async_trait]
pub trait FeedbackProvider: Judge {
    /// How well `answer` is supported by `context`, in [0, 1].
    async fn groundedness(&self, context: &str, answer: &str) -> AppResult<f32>;

    /// How well `answer` addresses `question`, in [0, 1].
    async fn answer_relevance(&self, question: &str, answer: &str) -> AppResult<f32>;
}

/// Judge that asks a completion model for a rating.
pub struct LlmJudge {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: ModelName,
}

impl LlmJudge {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, model: ModelName) -> Self {
        Self {
            client,
            prompts,
            model,
        }
    }

    async fn rate(&self, prompt_id: &str, variables: &[(&str, &str)]) -> AppResult<f32> {
        let built = self.prompts.render(prompt_id, variables)?;

        let mut request = LlmRequest::new(built.user, self.model.as_str())
            .with_temperature(0.0)
            .with_max_tokens(8);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.client.complete(&request).await?;
        let score = parse_score(&response.content)?;

        tracing::trace!(prompt = prompt_id, score, "Judge rating");
        Ok(score)
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn relevance(&self, context: &str, query: &str) -> AppResult<f32> {
        self.rate(CONTEXT_RELEVANCE, &[("context", context), ("question", query)])
            .await
    }
}

#[async_trait]
impl FeedbackProvider for LlmJudge {
    async fn groundedness(&self, context: &str, answer: &str) -> AppResult<f32> {
        self.rate(GROUNDEDNESS, &[("context", context), ("answer", answer)])
            .await
    }

    async fn answer_relevance(&self, question: &str, answer: &str) -> AppResult<f32> {
        self.rate(ANSWER_RELEVANCE, &[("question", question), ("answer", answer)])
            .await
    }
}

/// Parse a judge reply into a score in [0, 1].
///
/// The rating is the last number in the reply that does not describe the
/// scale itself: range bounds ("0-3", "0 to 3") and denominators ("out of 3",
/// "2/3") are skipped. It is divided by the top of the rating scale and
/// clamped.
pub fn parse_score(reply: &str) -> AppResult<f32> {
    let spans = number_spans(reply);
    let mut scale = vec![false; spans.len()];

    for (i, pair) in spans.windows(2).enumerate() {
        let between = reply[pair[0].1..pair[1].0].trim().to_lowercase();
        if matches!(between.as_str(), "-" | "\u{2013}" | "to") {
            scale[i] = true;
            scale[i + 1] = true;
        }
    }
    for (i, &(start, _)) in spans.iter().enumerate() {
        let before = reply[..start].trim_end().to_lowercase();
        if before.ends_with('/') || before.ends_with("out of") {
            scale[i] = true;
        }
    }

    let (start, end) = spans
        .iter()
        .zip(&scale)
        .filter(|(_, is_scale)| !**is_scale)
        .map(|(span, _)| *span)
        .last()
        .ok_or_else(|| AppError::Judge(format!("No rating in judge reply: {:?}", reply)))?;

    let rating: f32 = reply[start..end]
        .parse()
        .map_err(|_| AppError::Judge(format!("Unreadable rating in judge reply: {:?}", reply)))?;

    Ok((rating / MAX_RATING).clamp(0.0, 1.0))
}

/// Byte ranges of the decimal numbers in `text`. A trailing "." is not
/// part of the number.
fn number_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len()
            && (bytes[i].is_ascii_digit()
                || (bytes[i] == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)))
        {
            i += 1;
        }
        spans.push((start, i));
    }

    spans
}
