//! LLM prompts for the query pipeline.
//!
//! Each stage fills one template. User-supplied text is substituted last so
//! a question containing `{placeholder}` text cannot pull in other fields.

use crate::state::{format_history, ChatMessage};
use crate::types::attributes::AttributeCategory;

/// Prompt for rephrasing the latest question so it stands alone.
pub const SUMMARIZE_PROMPT: &str = r#"You are asked to **only rephrase** the last query made by the human, based on the ongoing conversation, so that it stands alone as a clear and independent question.

**Do not answer the human's query. Do not provide any details or context.** Keep every material ID (such as mp-149) mentioned in the conversation that the query refers to.

Conversation History:
{chat_history}
human: {query}

Rephrase the human's last query to make it a clear and independent question. Output only the rephrased question."#;

/// Prompt for classifying which stored attributes are relevant.
pub const RELATED_ATTRIBUTES_PROMPT: &str = r#"You are a materials science expert with access to a database of materials. Each material has a set of predefined attributes:

{attributes}

Based on the human's query, identify the material attributes that help answer the question. Include as many relevant attributes as possible and always include Material ID when any attribute applies.

Output JSON:
{
    "related_attributes": ["names of the relevant attributes from the list above"],
    "is_context_available": true if at least one attribute is relevant, otherwise false
}

The response should only contain the keys and values, without explanations or preambles.

Query: {query}"#;

/// Prompt for rewriting the question with attribute vocabulary.
pub const SEARCH_QUERY_PROMPT: &str = r#"You are a materials science expert. Rephrase the human's query to explicitly include the following material properties (attributes):

{related_attributes}

Avoid asking the human for clarification or additional details under any circumstances. Output only the rephrased query.

Query: {query}"#;

/// Prompt for judging how many records the question needs.
pub const RESULTS_LIMIT_PROMPT: &str = r#"You are a materials science expert. Determine the minimum number of materials whose information is necessary to answer the human's query. Be as precise and minimal as possible.

Output JSON:
{
    "required_data_points": integer, the minimum number of materials needed (at most {max})
}

The response should only contain the key and value, without explanations or preambles.

Query: {query}"#;

/// Prompt for answering from retrieved records.
pub const ANSWER_PROMPT: &str = r#"You are a materials science expert. Use the following pieces of context to answer the human's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
**Prioritize answering with markdown tables.** Keep one property per column and use the same unit and number format throughout a column.

Contexts:
{contexts}

Reminder: only use tables for data taken from the contexts above.

Question: {query}"#;

/// Prompt used when nothing relevant was retrieved.
pub const CLARIFY_PROMPT: &str = r#"You are a materials science assistant. The knowledge base returned no information for the human's question, so you cannot answer it from data.

Do not guess or invent property values. Briefly explain that nothing matching was found, then ask the human to clarify by giving a material ID (for example mp-149) or naming a material property such as band gap, formation energy, bulk modulus or magnetization.

Question: {query}"#;

pub fn format_summarize_prompt(query: &str, history: &[ChatMessage]) -> String {
    SUMMARIZE_PROMPT
        .replace("{chat_history}", &format_history(history))
        .replace("{query}", query)
}

pub fn format_related_attributes_prompt(summary: &str) -> String {
    RELATED_ATTRIBUTES_PROMPT
        .replace("{attributes}", &AttributeCategory::listing())
        .replace("{query}", summary)
}

pub fn format_search_query_prompt(summary: &str, attributes: &[String]) -> String {
    SEARCH_QUERY_PROMPT
        .replace("{related_attributes}", &attributes.join("\n"))
        .replace("{query}", summary)
}

pub fn format_results_limit_prompt(summary: &str, max: usize) -> String {
    RESULTS_LIMIT_PROMPT
        .replace("{max}", &max.to_string())
        .replace("{query}", summary)
}

pub fn format_answer_prompt(summary: &str, contexts: &[String]) -> String {
    ANSWER_PROMPT
        .replace("{contexts}", &contexts.join("\n"))
        .replace("{query}", summary)
}

pub fn format_clarify_prompt(summary: &str) -> String {
    CLARIFY_PROMPT.replace("{query}", summary)
}
