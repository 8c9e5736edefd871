//! Completion provider implementations.

pub mod cortex;
pub mod ollama;

pub use cortex::{http_client, snowflake_headers, CortexClient};
pub use ollama::{ollama_tag, OllamaClient};
