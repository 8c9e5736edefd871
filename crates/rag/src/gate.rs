//! Relevance gate: decides whether retrieved context is good enough to
//! answer from.

use crate::judge::Judge;
use crate::types::{ContextBundle, RelevanceVerdict};
use futures::future::try_join_all;
use ragchat_core::AppResult;
use std::sync::Arc;

/// Default acceptance threshold.
///
/// A bundle is accepted when its score is strictly greater than the
/// threshold, so at 0.0 only context judged wholly irrelevant falls back.
pub const DEFAULT_THRESHOLD: f32 = 0.0;

/// Threshold for deployments that prefer refusing over weak answers.
pub const STRICT_THRESHOLD: f32 = 0.75;

/// Scores a context bundle with a judge and applies the acceptance policy.
pub struct RelevanceGate {
    judge: Arc<dyn Judge>,
    threshold: f32,
}

impl RelevanceGate {
    pub fn new(judge: Arc<dyn Judge>, threshold: f32) -> Self {
        Self { judge, threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score every passage against `query` and average.
    ///
    /// An empty bundle scores 0 without consulting the judge. Judge failures
    /// propagate; a partial verdict is never produced.
    pub async fn score(&self, bundle: &ContextBundle, query: &str) -> AppResult<RelevanceVerdict> {
        if bundle.is_empty() {
            tracing::debug!("Empty context bundle; relevance is 0");
            return Ok(self.verdict(Vec::new()));
        }

        let passage_scores = try_join_all(
            bundle
                .passages()
                .iter()
                .map(|p| self.judge.relevance(&p.text, query)),
        )
        .await?;

        let verdict = self.verdict(passage_scores);
        tracing::info!(
            score = verdict.score,
            accepted = verdict.accepted,
            passages = verdict.passage_scores.len(),
            "Relevance gate verdict"
        );
        Ok(verdict)
    }

    /// Whether a score clears the threshold.
    pub fn accepts(&self, score: f32) -> bool {
        score > self.threshold
    }

    fn verdict(&self, passage_scores: Vec<f32>) -> RelevanceVerdict {
        let score = if passage_scores.is_empty() {
            0.0
        } else {
            passage_scores.iter().sum::<f32>() / passage_scores.len() as f32
        };

        RelevanceVerdict {
            score,
            accepted: self.accepts(score),
            passage_scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryFilter, RetrievedPassage};
    use async_trait::async_trait;
    use ragchat_core::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores passages by whether they mention the query's first word.
    struct KeywordJudge {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Judge for KeywordJudge {
        async fn relevance(&self, context: &str, query: &str) -> AppResult<f32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let keyword = query.split_whitespace().next().unwrap_or_default();
            Ok(if context.contains(keyword) { 1.0 } else { 0.0 })
        }
    }

    struct FailingJudge;

    #[async_trait]
    impl Judge for FailingJudge {
        async fn relevance(&self, _context: &str, _query: &str) -> AppResult<f32> {
            Err(AppError::Judge("unparseable".to_string()))
        }
    }

    fn bundle(texts: &[&str]) -> ContextBundle {
        let passages = texts
            .iter()
            .map(|t| RetrievedPassage {
                text: t.to_string(),
                source_path: "doc.md".to_string(),
                category: "book".to_string(),
                relevance_score: None,
            })
            .collect();
        ContextBundle::new("q", CategoryFilter::All, passages)
    }

    fn keyword_gate(threshold: f32) -> (RelevanceGate, Arc<KeywordJudge>) {
        let judge = Arc::new(KeywordJudge {
            calls: AtomicUsize::new(0),
        });
        (RelevanceGate::new(judge.clone(), threshold), judge)
    }

    #[tokio::test]
    async fn test_empty_bundle_scores_zero_without_judge() {
        let (gate, judge) = keyword_gate(DEFAULT_THRESHOLD);
        let verdict = gate.score(&bundle(&[]), "crate").await.unwrap();

        assert_eq!(verdict.score, 0.0);
        assert!(!verdict.accepted);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_score_is_mean_of_passage_scores() {
        let (gate, judge) = keyword_gate(DEFAULT_THRESHOLD);
        let verdict = gate
            .score(&bundle(&["crate docs", "pasta recipe"]), "crate")
            .await
            .unwrap();

        assert_eq!(verdict.passage_scores, vec![1.0, 0.0]);
        assert_eq!(verdict.score, 0.5);
        assert!(verdict.accepted);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_score_is_rejected() {
        let (gate, _judge) = keyword_gate(DEFAULT_THRESHOLD);
        let verdict = gate.score(&bundle(&["pasta recipe"]), "crate").await.unwrap();

        assert_eq!(verdict.score, 0.0);
        assert!(!verdict.accepted);
    }

    #[tokio::test]
    async fn test_strict_threshold_rejects_partial_relevance() {
        let (gate, _judge) = keyword_gate(STRICT_THRESHOLD);
        let verdict = gate
            .score(&bundle(&["crate docs", "pasta recipe"]), "crate")
            .await
            .unwrap();

        assert!(!verdict.accepted);
    }

    #[tokio::test]
    async fn test_judge_failure_propagates() {
        let gate = RelevanceGate::new(Arc::new(FailingJudge), DEFAULT_THRESHOLD);
        let err = gate.score(&bundle(&["text"]), "q").await.unwrap_err();
        assert!(matches!(err, AppError::Judge(_)));
    }
}
