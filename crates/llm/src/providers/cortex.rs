//! Snowflake Cortex completion provider.
//!
//! Calls the Cortex REST inference endpoint:
//! `POST {account_url}/api/v2/cortex/inference:complete`

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use ragchat_core::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Build the headers every Snowflake REST call needs.
pub fn snowflake_headers(token: &str) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| AppError::Config(format!("Invalid Snowflake token: {}", e)))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Ok(headers)
}

/// Build an HTTP client, optionally bounded by a timeout.
pub fn http_client(timeout_secs: Option<u64>) -> AppResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

#[derive(Debug, Serialize)]
struct CortexMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CortexRequest<'a> {
    model: &'a str,
    messages: Vec<CortexMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Cortex completion client.
pub struct CortexClient {
    account_url: String,
    token: String,
    client: reqwest::Client,
}

impl CortexClient {
    /// Create a client for an account URL and bearer token.
    pub fn new(account_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_http_client(account_url, token, reqwest::Client::new())
    }

    /// Create a client reusing a preconfigured HTTP client.
    pub fn with_http_client(
        account_url: impl Into<String>,
        token: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            account_url: account_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/v2/cortex/inference:complete", self.account_url)
    }

    fn to_cortex_request<'a>(&self, request: &'a LlmRequest) -> CortexRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(CortexMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(CortexMessage {
            role: "user",
            content: &request.prompt,
        });

        CortexRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

/// Extract the completion text and usage from a Cortex response body.
fn parse_completion(json: &Value, model: &str) -> AppResult<LlmResponse> {
    let choice = json
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| {
            AppError::CompletionUnavailable("Cortex response is missing choices".to_string())
        })?;

    let content = choice
        .pointer("/message/content")
        .or_else(|| choice.get("messages"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            AppError::CompletionUnavailable("Cortex choice has no message content".to_string())
        })?;

    let usage = json
        .get("usage")
        .map(|u| {
            let count = |key: &str| u.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            LlmUsage::new(count("prompt_tokens"), count("completion_tokens"))
        })
        .unwrap_or_default();

    Ok(LlmResponse {
        content: content.to_string(),
        model: json
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(model)
            .to_string(),
        usage,
    })
}

#[async_trait::async_trait]
impl LlmClient for CortexClient {
    fn provider_name(&self) -> &str {
        "cortex"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to Cortex");

        let response = self
            .client
            .post(self.endpoint())
            .headers(snowflake_headers(&self.token)?)
            .json(&self.to_cortex_request(request))
            .send()
            .await
            .map_err(|e| {
                AppError::CompletionUnavailable(format!("Failed to reach Cortex: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::CompletionUnavailable(format!(
                "Cortex API error ({}): {}",
                status, error_text
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            AppError::CompletionUnavailable(format!("Failed to parse Cortex response: {}", e))
        })?;

        let completion = parse_completion(&json, &request.model)?;
        tracing::debug!(
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "Received completion from Cortex"
        );

        Ok(completion)
    }
}
