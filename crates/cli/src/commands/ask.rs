//! Ask command handler.
//!
//! Runs a single turn and prints the reply to stdout.

use crate::commands::{build_pipeline, print_outcome};
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_rag::{CategoryFilter, ConversationState, SessionSettings};
use std::path::PathBuf;

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Category to restrict retrieval to (ALL for no filter)
    #[arg(long, default_value = "ALL")]
    pub category: String,

    /// Answer without retrieving context
    #[arg(long)]
    pub no_retrieval: bool,

    /// Show retrieved passages and relevance scores
    #[arg(long)]
    pub debug: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.get_question()?;
        let pipeline = build_pipeline(config)?;

        let settings = SessionSettings {
            model: pipeline.model,
            category: CategoryFilter::parse(&self.category),
            use_history: false,
            use_retrieval: !self.no_retrieval,
            debug: self.debug,
        };
        let mut state = ConversationState::new(config.chat.window_size, settings);

        let outcome = pipeline.controller.submit(&mut state, &question).await;

        if self.json {
            let output = serde_json::json!({
                "question": question,
                "answer": outcome.display_text(),
                "citations": outcome.citations(),
                "kind": outcome.result.as_ref().ok().map(|reply| reply.kind),
                "error": outcome.result.as_ref().err(),
                "model": state.settings.model,
                "provider": config.provider,
                "trace": &outcome.trace,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_outcome(&outcome, self.debug);
        }

        Ok(())
    }

    /// Get the question from the argument or the file.
    fn get_question(&self) -> AppResult<String> {
        let question = match (&self.question, &self.file) {
            (Some(question), _) => question.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => {
                return Err(AppError::InvalidInput("No question provided".to_string()));
            }
        };

        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(AppError::InvalidInput("Question is empty".to_string()));
        }
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        ask: AskCommand,
    }

    #[test]
    fn test_question_from_argument() {
        let harness = Harness::parse_from(["ask", "  What is a crate?  "]);
        assert_eq!(harness.ask.get_question().unwrap(), "What is a crate?");
        assert_eq!(harness.ask.category, "ALL");
    }

    #[test]
    fn test_missing_question() {
        let harness = Harness::parse_from(["ask"]);
        assert!(matches!(
            harness.ask.get_question(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_question_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("question.txt");
        std::fs::write(&path, "How can I ignore a test?\n").unwrap();

        let harness = Harness::parse_from(["ask", "--file", path.to_str().unwrap()]);
        assert_eq!(harness.ask.get_question().unwrap(), "How can I ignore a test?");
    }
}
