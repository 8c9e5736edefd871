//! Prompt system for ragchat.
//!
//! - Built-in templates for every pipeline stage
//! - YAML overrides under `.ragchat/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod library;
pub mod loader;
pub mod templates;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use library::PromptLibrary;
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
