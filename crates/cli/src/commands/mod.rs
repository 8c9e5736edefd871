//! Command handlers for the ragchat CLI.
//!
//! Every command drives the same pipeline, wired here from configuration.

pub mod ask;
pub mod chat;
pub mod evaluate;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use evaluate::EvaluateCommand;

use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_llm::{create_client, ModelName, ProviderType};
use ragchat_prompt::PromptLibrary;
use ragchat_rag::controller::ControllerOptions;
use ragchat_rag::{ConversationController, CortexSearchRetriever, LlmJudge, TurnOutcome};
use std::sync::Arc;

/// The collaborators a command needs, built once per process.
pub struct Pipeline {
    pub controller: Arc<ConversationController>,
    pub judge: Arc<LlmJudge>,
    pub model: ModelName,
}

/// Resolve the configured model name.
pub fn resolve_model(config: &AppConfig) -> AppResult<ModelName> {
    ModelName::parse(&config.model).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown model: {}. Supported: {}",
            config.model,
            ModelName::ALL.map(|m| m.as_str()).join(", ")
        ))
    })
}

/// Wire retriever, completion client, judge and prompts from configuration.
pub fn build_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    config.validate_search()?;
    let model = resolve_model(config)?;

    let token = config.resolve_token().ok_or_else(|| {
        AppError::Config(format!(
            "Search token not found in environment variable: {}",
            config.search.token_env
        ))
    })?;

    let prompts = Arc::new(PromptLibrary::load(&config.workspace)?);

    let provider = ProviderType::parse(&config.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", config.provider)))?;
    let (endpoint, provider_token, model_override) = match provider {
        ProviderType::Cortex => (
            config.search.account_url.as_deref(),
            Some(token.as_str()),
            None,
        ),
        ProviderType::Ollama => (
            Some(config.ollama.endpoint.as_str()),
            None,
            config.ollama.model.as_deref(),
        ),
    };
    let client = create_client(
        &config.provider,
        endpoint,
        provider_token,
        config.search.timeout_secs,
        model_override,
    )?;

    let retriever = Arc::new(CortexSearchRetriever::from_config(&config.search, &token)?);
    let judge = Arc::new(LlmJudge::new(client.clone(), prompts.clone(), model));

    let controller = ConversationController::new(
        retriever,
        client,
        judge.clone(),
        prompts,
        ControllerOptions {
            retrieval_limit: config.search.limit,
            threshold: config.chat.threshold,
        },
    );

    tracing::debug!(
        provider = provider.as_str(),
        model = %model,
        limit = config.search.limit,
        threshold = config.chat.threshold,
        "Pipeline ready"
    );

    Ok(Pipeline {
        controller: Arc::new(controller),
        judge,
        model,
    })
}

/// Print a turn's reply, its sources, and optionally its trace.
pub fn print_outcome(outcome: &TurnOutcome, debug: bool) {
    println!("{}", outcome.display_text());

    if let Some(citations) = outcome.citations() {
        if !citations.is_empty() {
            println!();
            println!("Sources:");
            for path in citations {
                println!("- {}", path);
            }
        }
    }

    if debug {
        let trace = &outcome.trace;
        println!();
        println!(
            "[debug] phases: {}",
            trace
                .phases
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        if let Some(query) = &trace.retrieval_query {
            println!("[debug] retrieval query: {}", query);
        }
        if let Some(verdict) = &trace.verdict {
            println!(
                "[debug] relevance: {:.3} ({}) per passage: {:?}",
                verdict.score,
                if verdict.accepted { "accepted" } else { "rejected" },
                verdict.passage_scores
            );
        }
        for (i, passage) in trace.passages.iter().enumerate() {
            println!(
                "[debug] passage {} [{}] {}: {}",
                i + 1,
                passage.category,
                passage.source_path,
                passage.text.trim()
            );
        }
    }
}
