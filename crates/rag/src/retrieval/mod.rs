//! Retriever adapter: turns a query into ranked passages.

pub mod cortex;

pub use cortex::CortexSearchRetriever;

use crate::types::{RetrievedPassage, SearchFilter};
use async_trait::async_trait;
use ragchat_core::{AppError, AppResult};

/// Default number of passages requested per search.
pub const DEFAULT_LIMIT: usize = 5;

/// A search service that returns passages ranked by relevance.
///
/// Implementations return at most `limit` passages, most relevant first, and
/// never retry. Transport failures surface as
/// [`AppError::RetrievalUnavailable`]; responses of the wrong shape as
/// [`AppError::MalformedRetrievalResult`].
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> AppResult<Vec<RetrievedPassage>>;
}

/// Reject searches no backend could answer.
pub fn validate_search(query: &str, limit: usize) -> AppResult<()> {
    if query.trim().is_empty() {
        return Err(AppError::InvalidInput("Search query is empty".to_string()));
    }
    if limit == 0 {
        return Err(AppError::InvalidInput(
            "Search limit must be at least 1".to_string(),
        ));
    }
    Ok(())
}
