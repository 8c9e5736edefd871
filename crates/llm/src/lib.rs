//! Completion model integration for ragchat.
//!
//! Provides a provider-agnostic `LlmClient` trait and two implementations:
//!
//! # Providers
//! - **Cortex**: Snowflake Cortex REST inference (default)
//! - **Ollama**: local runtime for development
//!
//! # Example
//! ```no_run
//! use ragchat_llm::{LlmClient, LlmRequest, ModelName, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", ModelName::default().as_str());
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{CortexClient, OllamaClient};
pub use types::{ModelName, ProviderType};
