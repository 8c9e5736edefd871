//! Answer synthesis from retrieved context.

use crate::types::ContextBundle;
use ragchat_core::AppResult;
use ragchat_llm::{LlmClient, LlmRequest, ModelName};
use ragchat_prompt::templates::{DIRECT_ANSWER, GROUNDED_ANSWER};
use ragchat_prompt::PromptLibrary;

/// Sampling temperature for answers.
const ANSWER_TEMPERATURE: f32 = 0.3;

/// Maximum tokens generated per answer.
const ANSWER_MAX_TOKENS: u32 = 1000;

/// Answer `query` using only the passages in `bundle`.
pub async fn answer(
    client: &dyn LlmClient,
    prompts: &PromptLibrary,
    model: ModelName,
    query: &str,
    bundle: &ContextBundle,
) -> AppResult<String> {
    tracing::debug!(
        model = %model,
        passages = bundle.len(),
        "Synthesizing grounded answer"
    );

    let context = bundle.render();
    let built = prompts.render(
        GROUNDED_ANSWER,
        &[("context", context.as_str()), ("question", query)],
    )?;
    complete(client, model, built.user, built.system).await
}

/// Answer `question` without retrieved context.
pub async fn answer_directly(
    client: &dyn LlmClient,
    prompts: &PromptLibrary,
    model: ModelName,
    question: &str,
) -> AppResult<String> {
    tracing::debug!(model = %model, "Answering without retrieval");

    let built = prompts.render(DIRECT_ANSWER, &[("question", question)])?;
    complete(client, model, built.user, built.system).await
}

async fn complete(
    client: &dyn LlmClient,
    model: ModelName,
    prompt: String,
    system: Option<String>,
) -> AppResult<String> {
    let mut request = LlmRequest::new(prompt, model.as_str())
        .with_temperature(ANSWER_TEMPERATURE)
        .with_max_tokens(ANSWER_MAX_TOKENS);
    if let Some(system) = system {
        request = request.with_system(system);
    }

    let response = client.complete(&request).await?;
    Ok(response.content.trim().to_string())
}
