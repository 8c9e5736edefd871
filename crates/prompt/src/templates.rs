//! Built-in prompt templates.
//!
//! Every pipeline stage renders one of these by id. A workspace may replace
//! any of them with `.ragchat/prompts/<id>.yml`.

use crate::types::PromptDefinition;

/// Rewrites a follow-up question into a standalone retrieval query.
/// Variables: `history`, `question`.
pub const QUERY_REWRITE: &str = "chat.rewrite";

/// Answers strictly from retrieved context.
/// Variables: `context`, `question`.
pub const GROUNDED_ANSWER: &str = "chat.answer";

/// Answers without retrieval.
/// Variables: `question`.
pub const DIRECT_ANSWER: &str = "chat.direct";

/// Scores how relevant one passage is to a question, 0 to 3.
/// Variables: `context`, `question`.
pub const CONTEXT_RELEVANCE: &str = "judge.context_relevance";

/// Scores how well an answer is supported by context, 0 to 3.
/// Variables: `context`, `answer`.
pub const GROUNDEDNESS: &str = "eval.groundedness";

/// Scores how relevant an answer is to the question, 0 to 3.
/// Variables: `question`, `answer`.
pub const ANSWER_RELEVANCE: &str = "eval.answer_relevance";

/// Ids of all built-in prompts.
pub const BUILTIN_IDS: [&str; 6] = [
    QUERY_REWRITE,
    GROUNDED_ANSWER,
    DIRECT_ANSWER,
    CONTEXT_RELEVANCE,
    GROUNDEDNESS,
    ANSWER_RELEVANCE,
];

const QUERY_REWRITE_TEMPLATE: &str = "\
Based on the chat history below and the question, generate a query that extends the question \
with the chat history provided. The query should be in natural language.
Answer with only the query. Do not add any explanation.

<chat_history>
{{history}}
</chat_history>
<question>
{{question}}
</question>";

const GROUNDED_ANSWER_TEMPLATE: &str = "\
You are an expert assistant extracting information from the context provided.
Answer the question based only on the context. Be concise and do not hallucinate.
If the context does not contain the information, say so explicitly.

Context:
{{context}}

Question:
{{question}}

Answer:";

const DIRECT_ANSWER_TEMPLATE: &str = "\
You are an expert assistant. Answer the question concisely and do not hallucinate.
If you do not know the answer, say so.

Question:
{{question}}

Answer:";

const CONTEXT_RELEVANCE_TEMPLATE: &str = "\
You are a RELEVANCE grader. Rate how relevant the CONTEXT is to the QUESTION.
Respond only with an integer from 0 to 3, where 0 means not relevant at all and 3 means \
fully relevant. Do not explain.

QUESTION: {{question}}

CONTEXT: {{context}}

RELEVANCE:";

const GROUNDEDNESS_TEMPLATE: &str = "\
You are an INFORMATION OVERLAP grader. Rate how well the STATEMENT is supported by the SOURCE.
Respond only with an integer from 0 to 3, where 0 means no claim is supported and 3 means \
every claim is supported. Do not explain.

SOURCE: {{context}}

STATEMENT: {{answer}}

SUPPORT:";

const ANSWER_RELEVANCE_TEMPLATE: &str = "\
You are a RELEVANCE grader. Rate how relevant the RESPONSE is to the PROMPT.
Respond only with an integer from 0 to 3, where 0 means the response ignores the prompt and 3 \
means it fully answers it. Do not explain.

PROMPT: {{question}}

RESPONSE: {{answer}}

RELEVANCE:";

/// Variables the pipeline supplies when rendering `id`.
///
/// An override must use every one of them.
pub fn variables(id: &str) -> &'static [&'static str] {
    match id {
        QUERY_REWRITE => &["history", "question"],
        GROUNDED_ANSWER | CONTEXT_RELEVANCE => &["context", "question"],
        DIRECT_ANSWER => &["question"],
        GROUNDEDNESS => &["context", "answer"],
        ANSWER_RELEVANCE => &["question", "answer"],
        _ => &[],
    }
}

/// Look up a built-in prompt definition.
pub fn builtin(id: &str) -> Option<PromptDefinition> {
    let (title, template) = match id {
        QUERY_REWRITE => ("Standalone query rewrite", QUERY_REWRITE_TEMPLATE),
        GROUNDED_ANSWER => ("Grounded answer", GROUNDED_ANSWER_TEMPLATE),
        DIRECT_ANSWER => ("Direct answer", DIRECT_ANSWER_TEMPLATE),
        CONTEXT_RELEVANCE => ("Context relevance", CONTEXT_RELEVANCE_TEMPLATE),
        GROUNDEDNESS => ("Groundedness", GROUNDEDNESS_TEMPLATE),
        ANSWER_RELEVANCE => ("Answer relevance", ANSWER_RELEVANCE_TEMPLATE),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        created_by: "builtin".to_string(),
        system: None,
        template: template.to_string(),
    })
}
