//! Retrieval types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Column the category filter applies to.
pub const CATEGORY_COLUMN: &str = "category";

/// A retrieved chunk of source-document text with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Chunk text
    pub text: String,

    /// Path of the source document, relative to the document stage
    pub source_path: String,

    /// Document category
    pub category: String,

    /// Score reported by the search engine, when it reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

/// Category selection for a conversation.
///
/// `All` is the "ALL" sentinel of the category selector and means no filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Equals(String),
}

impl CategoryFilter {
    /// Selector value meaning "no filter".
    pub const ALL_SENTINEL: &'static str = "ALL";

    /// Parse a selector value. Blank input and "ALL" mean no filter.
    pub fn parse(s: &str) -> Self {
        let value = s.trim();
        if value.is_empty() || value == Self::ALL_SENTINEL {
            Self::All
        } else {
            Self::Equals(value.to_string())
        }
    }

    /// The search predicate for this selection, if any.
    pub fn to_search_filter(&self) -> Option<SearchFilter> {
        match self {
            Self::All => None,
            Self::Equals(value) => Some(SearchFilter::equals(CATEGORY_COLUMN, value)),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(Self::ALL_SENTINEL),
            Self::Equals(value) => f.write_str(value),
        }
    }
}

/// Equality predicate on one attribute column of the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub column: String,
    pub value: String,
}

impl SearchFilter {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Cortex Search filter syntax: `{"@eq": {column: value}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut predicate = serde_json::Map::new();
        predicate.insert(
            self.column.clone(),
            serde_json::Value::String(self.value.clone()),
        );
        serde_json::json!({ "@eq": predicate })
    }
}

/// The passages retrieved for one turn.
///
/// All passages come from a single search call, so they share one query and
/// one filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBundle {
    query: String,
    filter: CategoryFilter,
    passages: Vec<RetrievedPassage>,
}

impl ContextBundle {
    pub fn new(
        query: impl Into<String>,
        filter: CategoryFilter,
        passages: Vec<RetrievedPassage>,
    ) -> Self {
        Self {
            query: query.into(),
            filter,
            passages,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    pub fn passages(&self) -> &[RetrievedPassage] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Distinct source paths, in retrieval order.
    pub fn source_paths(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.passages
            .iter()
            .filter(|p| seen.insert(p.source_path.as_str()))
            .map(|p| p.source_path.clone())
            .collect()
    }

    /// Serialize the passages for a prompt.
    pub fn render(&self) -> String {
        self.passages
            .iter()
            .enumerate()
            .map(|(i, p)| format!("[Passage {}] ({})\n{}", i + 1, p.source_path, p.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    pub fn into_passages(self) -> Vec<RetrievedPassage> {
        self.passages
    }
}

/// Outcome of scoring a context bundle against a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    /// Mean of the passage scores, in [0, 1]; 0 for an empty bundle
    pub score: f32,

    /// One score per passage, in bundle order
    pub passage_scores: Vec<f32>,

    /// Whether the context is good enough to answer from
    pub accepted: bool,
}
