//! ragchat CLI
//!
//! Main entry point for the ragchat command-line tool.
//! Chat with a document corpus through retrieval-augmented generation.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, EvaluateCommand};
use ragchat_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppError, AppResult,
};
use std::path::PathBuf;
use tracing::Instrument;

/// ragchat - retrieval-augmented chat over your documents
#[derive(Parser, Debug)]
#[command(name = "ragchat")]
#[command(about = "Retrieval-augmented chat over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGCHAT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Completion provider (cortex, ollama)
    #[arg(short, long, global = true, env = "RAGCHAT_PROVIDER")]
    provider: Option<String>,

    /// Completion model (mistral-large2, llama3.1-70b, snowflake-arctic)
    #[arg(short, long, global = true, env = "RAGCHAT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive chat session
    Chat(ChatCommand),

    /// Ask a single question
    Ask(AskCommand),

    /// Score the pipeline on a question set
    Evaluate(EvaluateCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration from the workspace, file and environment
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let log_format = match cli.log_format.as_deref() {
        Some(name) => LogFormat::parse(name)
            .ok_or_else(|| AppError::Config(format!("Unknown log format: {}", name)))?,
        None if config.log_json => LogFormat::Json,
        None => LogFormat::Pretty,
    };

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    // Log startup
    tracing::info!("ragchat starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;

    // Ensure .ragchat directory exists
    config.ensure_ragchat_dir()?;

    let command_name = match &cli.command {
        Commands::Chat(_) => "chat",
        Commands::Ask(_) => "ask",
        Commands::Evaluate(_) => "evaluate",
    };
    let span = tracing::info_span!("command", name = command_name);

    // Route to command handlers
    let result = async move {
        match cli.command {
            Commands::Chat(cmd) => cmd.execute(&config).await,
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Evaluate(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
