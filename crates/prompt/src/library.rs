//! The set of prompts a session renders from.

use crate::builder::build_prompt;
use crate::loader::{list_prompts, load_prompt};
use crate::templates::{self, BUILTIN_IDS};
use crate::types::{BuiltPrompt, PromptDefinition};
use ragchat_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// Resolved prompt definitions, keyed by id.
///
/// Loaded once at startup so a running session never sees a template change.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: HashMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Library containing only the built-in templates.
    pub fn builtin() -> Self {
        let prompts = BUILTIN_IDS
            .iter()
            .filter_map(|id| templates::builtin(id).map(|def| (id.to_string(), def)))
            .collect();
        Self { prompts }
    }

    /// Built-in templates overlaid with the workspace's overrides.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        for id in list_prompts(workspace)? {
            if !BUILTIN_IDS.contains(&id.as_str()) {
                tracing::warn!("Ignoring prompt override for unknown id: {}", id);
            }
        }

        let mut prompts = HashMap::with_capacity(BUILTIN_IDS.len());
        for id in BUILTIN_IDS {
            prompts.insert(id.to_string(), load_prompt(workspace, id)?);
        }
        tracing::debug!("Prompt library loaded with {} prompts", prompts.len());
        Ok(Self { prompts })
    }

    /// Look up a definition.
    pub fn get(&self, id: &str) -> Option<&PromptDefinition> {
        self.prompts.get(id)
    }

    /// Render the prompt `id` with the given variables.
    pub fn render(&self, id: &str, variables: &[(&str, &str)]) -> AppResult<BuiltPrompt> {
        let definition = self
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))?;

        let variables = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        build_prompt(definition, variables)
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_has_every_prompt() {
        let library = PromptLibrary::builtin();
        for id in BUILTIN_IDS {
            assert!(library.get(id).is_some(), "missing {}", id);
        }
    }

    #[test]
    fn test_render_rewrite() {
        let library = PromptLibrary::builtin();
        let built = library
            .render(
                templates::QUERY_REWRITE,
                &[("history", "user: What is a crate?"), ("question", "And a package?")],
            )
            .unwrap();

        assert!(built.user.contains("user: What is a crate?"));
        assert!(built.user.contains("And a package?"));
        assert!(built.user.contains("Answer with only the query"));
    }

    #[test]
    fn test_render_unknown_id() {
        let library = PromptLibrary::builtin();
        assert!(library.render("chat.nope", &[]).is_err());
    }

    #[test]
    fn test_load_without_overrides_matches_builtin() {
        let temp = TempDir::new().unwrap();
        let library = PromptLibrary::load(temp.path()).unwrap();
        assert_eq!(
            library.get(templates::DIRECT_ANSWER).unwrap().template,
            PromptLibrary::builtin().get(templates::DIRECT_ANSWER).unwrap().template
        );
    }

    #[test]
    fn test_load_rejects_override_that_drops_context() {
        let temp = TempDir::new().unwrap();
        let prompts = temp.path().join(".ragchat").join("prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(
            prompts.join("chat.answer.yml"),
            r#"
id: chat.answer
title: Answer
apiVersion: "1.0"
template: "Answer only from context.\nContext:\n{{contxt}}\nQuestion: {{question}}"
"#,
        )
        .unwrap();

        assert!(matches!(
            PromptLibrary::load(temp.path()),
            Err(AppError::Prompt(_))
        ));
    }
}
