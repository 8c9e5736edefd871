//! Completion client factory.
//!
//! Resolves a provider name plus connection settings into a shared
//! `LlmClient` trait object.

use crate::client::LlmClient;
use crate::providers::{http_client, CortexClient, OllamaClient};
use crate::types::ProviderType;
use ragchat_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a completion client.
///
/// # Arguments
/// * `provider` - Provider identifier ("cortex", "ollama")
/// * `endpoint` - Account URL for Cortex, base URL for Ollama
/// * `token` - Bearer token (required for Cortex)
/// * `timeout_secs` - Optional client-side HTTP timeout
/// * `model_override` - Ollama tag used in place of the requested model
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// setting is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    token: Option<&str>,
    timeout_secs: Option<u64>,
    model_override: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    match provider_type {
        ProviderType::Cortex => {
            let account_url = endpoint.ok_or_else(|| {
                AppError::Config("Cortex provider requires an account URL".to_string())
            })?;
            let token = token.ok_or_else(|| {
                AppError::Config("Cortex provider requires a token".to_string())
            })?;
            let client =
                CortexClient::with_http_client(account_url, token, http_client(timeout_secs)?);
            Ok(Arc::new(client))
        }
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            let mut client = OllamaClient::with_base_url(base_url);
            if let Some(model) = model_override {
                client = client.with_model(model);
            }
            Ok(Arc::new(client))
        }
    }
}
