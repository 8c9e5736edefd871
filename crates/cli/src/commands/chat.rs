//! Interactive chat session.

use crate::commands::{build_pipeline, print_outcome, resolve_model};
use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_llm::ModelName;
use ragchat_rag::{CategoryFilter, ConversationState, SessionSettings};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Start an interactive chat session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Category to restrict retrieval to (ALL for no filter)
    #[arg(long, default_value = "ALL")]
    pub category: String,

    /// Do not rewrite follow-up questions from chat history
    #[arg(long)]
    pub no_history: bool,

    /// Answer without retrieving context
    #[arg(long)]
    pub no_retrieval: bool,

    /// Show retrieved passages and relevance scores
    #[arg(long)]
    pub debug: bool,
}

/// A slash command typed at the chat prompt.
#[derive(Debug, Clone, PartialEq)]
enum ReplCommand {
    Reset,
    Model(ModelName),
    Category(CategoryFilter),
    History(bool),
    Retrieval(bool),
    Debug(bool),
    Settings,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  /reset                 clear the conversation
  /model <name>          mistral-large2 | llama3.1-70b | snowflake-arctic
  /category <name|ALL>   restrict retrieval to a category
  /history on|off        rewrite follow-ups from recent turns
  /retrieval on|off      answer from retrieved context
  /debug on|off          show retrieved passages and scores
  /settings              show the current settings
  /quit                  leave the session";

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let pipeline = build_pipeline(config)?;
        let settings = SessionSettings {
            model: resolve_model(config)?,
            category: CategoryFilter::parse(&self.category),
            use_history: !self.no_history,
            use_retrieval: !self.no_retrieval,
            debug: self.debug,
        };
        let mut state = ConversationState::new(config.chat.window_size, settings);
        tracing::debug!(session = %state.session_id(), "Chat session started");

        println!("ragchat ({}). Type /help for commands.", pipeline.model);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('/') {
                match parse_command(line) {
                    Ok(ReplCommand::Quit) => break,
                    Ok(command) => apply_command(&pipeline.controller, &mut state, command),
                    Err(message) => println!("{}", message),
                }
                continue;
            }

            let outcome = pipeline.controller.submit(&mut state, line).await;
            print_outcome(&outcome, state.settings.debug);
            println!();
        }

        tracing::info!(turns = state.len(), "Chat session ended");
        Ok(())
    }
}

fn apply_command(
    controller: &ragchat_rag::ConversationController,
    state: &mut ConversationState,
    command: ReplCommand,
) {
    match command {
        ReplCommand::Reset => {
            controller.reset(state);
            println!("Conversation cleared.");
        }
        ReplCommand::Model(model) => {
            state.settings.model = model;
            println!("Model: {}", model);
        }
        ReplCommand::Category(category) => {
            println!("Category: {}", category);
            state.settings.category = category;
        }
        ReplCommand::History(on) => {
            state.settings.use_history = on;
            println!("Chat history: {}", on_off(on));
        }
        ReplCommand::Retrieval(on) => {
            state.settings.use_retrieval = on;
            println!("Retrieval: {}", on_off(on));
        }
        ReplCommand::Debug(on) => {
            state.settings.debug = on;
            println!("Debug: {}", on_off(on));
        }
        ReplCommand::Settings => {
            let s = &state.settings;
            println!("Model: {}", s.model);
            println!("Category: {}", s.category);
            println!("Chat history: {}", on_off(s.use_history));
            println!("Retrieval: {}", on_off(s.use_retrieval));
            println!("Debug: {}", on_off(s.debug));
            println!("Turns: {}", state.len());
        }
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit => {}
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn parse_toggle(value: Option<&str>, name: &str) -> Result<bool, String> {
    match value.map(str::to_lowercase).as_deref() {
        Some("on") | Some("true") | Some("yes") => Ok(true),
        Some("off") | Some("false") | Some("no") => Ok(false),
        _ => Err(format!("Usage: /{} on|off", name)),
    }
}

/// Parse a slash command line.
fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let mut parts = line.trim_start_matches('/').splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match name.as_str() {
        "reset" | "clear" => Ok(ReplCommand::Reset),
        "model" => {
            let value = arg.ok_or_else(|| format!("Usage: /model <name>\n\n{}", HELP))?;
            ModelName::parse(value)
                .map(ReplCommand::Model)
                .ok_or_else(|| format!("Unknown model: {}", value))
        }
        "category" => arg
            .map(|value| ReplCommand::Category(CategoryFilter::parse(value)))
            .ok_or_else(|| "Usage: /category <name|ALL>".to_string()),
        "history" => parse_toggle(arg, "history").map(ReplCommand::History),
        "retrieval" => parse_toggle(arg, "retrieval").map(ReplCommand::Retrieval),
        "debug" => parse_toggle(arg, "debug").map(ReplCommand::Debug),
        "settings" => Ok(ReplCommand::Settings),
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
        other => Err(format!("Unknown command: /{}. Type /help for commands.", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("/reset"), Ok(ReplCommand::Reset));
        assert_eq!(parse_command("/quit"), Ok(ReplCommand::Quit));
        assert_eq!(parse_command("/HELP"), Ok(ReplCommand::Help));
    }

    #[test]
    fn test_parse_model() {
        assert_eq!(
            parse_command("/model llama3.1-70b"),
            Ok(ReplCommand::Model(ModelName::Llama70b))
        );
        assert!(parse_command("/model gpt-4").is_err());
        assert!(parse_command("/model").is_err());
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(
            parse_command("/category ALL"),
            Ok(ReplCommand::Category(CategoryFilter::All))
        );
        assert_eq!(
            parse_command("/category rust-book"),
            Ok(ReplCommand::Category(CategoryFilter::Equals(
                "rust-book".to_string()
            )))
        );
    }

    #[test]
    fn test_parse_toggles() {
        assert_eq!(parse_command("/history off"), Ok(ReplCommand::History(false)));
        assert_eq!(parse_command("/retrieval ON"), Ok(ReplCommand::Retrieval(true)));
        assert_eq!(parse_command("/debug on"), Ok(ReplCommand::Debug(true)));
        assert!(parse_command("/debug maybe").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_command("/frobnicate").is_err());
    }
}
