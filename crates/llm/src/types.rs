//! Model and provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The completion models a conversation can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelName {
    #[default]
    #[serde(rename = "mistral-large2")]
    MistralLarge2,
    #[serde(rename = "llama3.1-70b")]
    Llama70b,
    #[serde(rename = "snowflake-arctic")]
    SnowflakeArctic,
}

impl ModelName {
    /// All selectable models, default first.
    pub const ALL: [ModelName; 3] = [
        ModelName::MistralLarge2,
        ModelName::Llama70b,
        ModelName::SnowflakeArctic,
    ];

    /// Parse a model name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.as_str() == wanted)
    }

    /// The identifier sent to the completion service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MistralLarge2 => "mistral-large2",
            Self::Llama70b => "llama3.1-70b",
            Self::SnowflakeArctic => "snowflake-arctic",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Cortex,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cortex" | "snowflake" => Some(Self::Cortex),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cortex => "cortex",
            Self::Ollama => "ollama",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!(ModelName::parse("mistral-large2"), Some(ModelName::MistralLarge2));
        assert_eq!(ModelName::parse("Llama3.1-70B"), Some(ModelName::Llama70b));
        assert_eq!(
            ModelName::parse(" snowflake-arctic "),
            Some(ModelName::SnowflakeArctic)
        );
        assert_eq!(ModelName::parse("gpt-4"), None);
    }

    #[test]
    fn test_model_serde_uses_service_ids() {
        let json = serde_json::to_string(&ModelName::Llama70b).unwrap();
        assert_eq!(json, "\"llama3.1-70b\"");
    }

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("cortex"), Some(ProviderType::Cortex));
        assert_eq!(ProviderType::parse("Snowflake"), Some(ProviderType::Cortex));
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("openai"), None);
    }
}
