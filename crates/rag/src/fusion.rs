//! Context fusion: rewrite a follow-up question into a standalone query.

use crate::conversation::Turn;
use ragchat_core::AppResult;
use ragchat_llm::{LlmClient, LlmRequest, ModelName};
use ragchat_prompt::templates::QUERY_REWRITE;
use ragchat_prompt::PromptLibrary;

/// Serialize turns as `role: content` lines.
pub fn serialize_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip quote characters and surrounding whitespace from a model reply.
pub fn sanitize_query(raw: &str) -> String {
    raw.replace(['"', '\''], "").trim().to_string()
}

/// Produce the retrieval query for `question` given recent `history`.
///
/// With no history the question is returned unchanged and no model call is
/// made. A rewrite that sanitizes to nothing falls back to the question.
pub async fn rewrite_query(
    client: &dyn LlmClient,
    prompts: &PromptLibrary,
    model: ModelName,
    history: &[Turn],
    question: &str,
) -> AppResult<String> {
    if history.is_empty() {
        return Ok(question.to_string());
    }

    let history_text = serialize_history(history);
    let built = prompts.render(
        QUERY_REWRITE,
        &[("history", history_text.as_str()), ("question", question)],
    )?;

    let mut request = LlmRequest::new(built.user, model.as_str()).with_temperature(0.0);
    if let Some(system) = built.system {
        request = request.with_system(system);
    }

    let response = client.complete(&request).await?;
    let query = sanitize_query(&response.content);

    if query.is_empty() {
        tracing::warn!("Query rewrite came back empty; using the question as-is");
        return Ok(question.to_string());
    }

    tracing::debug!(history_turns = history.len(), query = %query, "Rewrote follow-up question");
    Ok(query)
}
