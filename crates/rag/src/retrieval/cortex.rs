//! Cortex Search retriever.
//!
//! Queries a Cortex Search service over REST:
//! `POST {account_url}/api/v2/databases/{db}/schemas/{schema}/cortex-search-services/{service}:query`

use crate::retrieval::{validate_search, Retriever};
use crate::types::{RetrievedPassage, SearchFilter};
use async_trait::async_trait;
use ragchat_core::config::SearchConfig;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::providers::{http_client, snowflake_headers};
use serde::Serialize;
use serde_json::Value;

/// Attribute columns requested from the search service.
pub const SEARCH_COLUMNS: [&str; 3] = ["chunk", "relative_path", "category"];

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    columns: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    limit: usize,
}

/// Retriever backed by a Snowflake Cortex Search service.
pub struct CortexSearchRetriever {
    account_url: String,
    database: String,
    schema: String,
    service: String,
    token: String,
    client: reqwest::Client,
}

impl CortexSearchRetriever {
    pub fn new(
        account_url: impl Into<String>,
        database: impl Into<String>,
        schema: impl Into<String>,
        service: impl Into<String>,
        token: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            account_url: account_url.into().trim_end_matches('/').to_string(),
            database: database.into(),
            schema: schema.into(),
            service: service.into(),
            token: token.into(),
            client,
        }
    }

    /// Build a retriever from validated search settings.
    pub fn from_config(config: &SearchConfig, token: &str) -> AppResult<Self> {
        let require = |name: &str, value: &Option<String>| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(format!("Missing search setting: {}", name)))
        };

        Ok(Self::new(
            require("search.accountUrl", &config.account_url)?,
            require("search.database", &config.database)?,
            require("search.schema", &config.schema)?,
            require("search.service", &config.service)?,
            token,
            http_client(config.timeout_secs)?,
        ))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/v2/databases/{}/schemas/{}/cortex-search-services/{}:query",
            self.account_url, self.database, self.schema, self.service
        )
    }
}

#[async_trait]
impl Retriever for CortexSearchRetriever {
    async fn search(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> AppResult<Vec<RetrievedPassage>> {
        validate_search(query, limit)?;

        tracing::info!(
            service = %self.service,
            limit,
            filtered = filter.is_some(),
            "Querying Cortex Search"
        );

        let body = SearchRequest {
            query,
            columns: &SEARCH_COLUMNS,
            filter: filter.map(SearchFilter::to_json),
            limit,
        };

        let response = self
            .client
            .post(self.endpoint())
            .headers(snowflake_headers(&self.token)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::RetrievalUnavailable(format!("Failed to reach Cortex Search: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::RetrievalUnavailable(format!(
                "Cortex Search error ({}): {}",
                status, error_text
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            AppError::MalformedRetrievalResult(format!("Response is not JSON: {}", e))
        })?;

        let mut passages = parse_search_response(&json)?;
        passages.truncate(limit);

        tracing::debug!("Cortex Search returned {} passages", passages.len());
        Ok(passages)
    }
}

/// Extract passages from a Cortex Search response body.
///
/// Every result must carry `chunk` and `relative_path` strings. `category`
/// may be absent or null. The cosine score under `@scores` is kept when the
/// service reports it.
pub fn parse_search_response(json: &Value) -> AppResult<Vec<RetrievedPassage>> {
    let results = json
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            AppError::MalformedRetrievalResult("Missing results array".to_string())
        })?;

    results
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let text_field = |key: &str| {
                item.get(key)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        AppError::MalformedRetrievalResult(format!(
                            "Result {} has no string field '{}'",
                            i, key
                        ))
                    })
            };

            let category = match item.get("category") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => {
                    return Err(AppError::MalformedRetrievalResult(format!(
                        "Result {} has a non-string category: {}",
                        i, other
                    )))
                }
            };

            Ok(RetrievedPassage {
                text: text_field("chunk")?,
                source_path: text_field("relative_path")?,
                category,
                relevance_score: item
                    .pointer("/@scores/cosine_similarity")
                    .and_then(|v| v.as_f64())
                    .map(|s| s as f32),
            })
        })
        .collect()
}
