//! Prompt construction for grounded answering.
//!
//! Builds the full prompt sent to the language model: system instructions,
//! rolling chat history, the assembled context block, and the user's
//! question. Also post-processes model output, stripping any trailing
//! "Sources:" section the model emits despite instructions — citations come
//! only from retrieval, never from generated text.

use crate::context::NO_CONTEXT_NOTICE;
use crate::models::ConversationTurn;

/// Render recent turns as a `User:`/`Assistant:` transcript for the prompt.
pub fn history_text(history: &[ConversationTurn]) -> String {
    let mut out = String::new();
    for turn in history {
        out.push_str("User: ");
        out.push_str(&turn.query);
        out.push('\n');
        out.push_str("Assistant: ");
        out.push_str(&turn.response);
        out.push('\n');
    }
    out
}

/// Assemble the full prompt.
///
/// `corpus_name` names the documentation set in the instructions (e.g.
/// "the GitLab Handbook"). An empty `context` is replaced with the
/// no-context notice so the model knows nothing was retrieved.
pub fn build_prompt(
    corpus_name: &str,
    context: &str,
    history: &[ConversationTurn],
    question: &str,
) -> String {
    let context = if context.is_empty() {
        NO_CONTEXT_NOTICE
    } else {
        context
    };

    format!(
        "You are a helpful assistant that answers questions about {corpus}.\n\
         \n\
         GUIDELINES:\n\
         1. Only answer based on the provided context from {corpus}.\n\
         2. If the context does not contain the relevant information, clearly say so.\n\
         3. Never invent source URLs or section titles; reference only what appears in the context.\n\
         4. Be transparent about uncertainty.\n\
         5. Structure your response clearly and include the relevant details from the context.\n\
         6. If asked about topics outside {corpus}, politely redirect to questions it can answer.\n\
         7. Do not include a \"Sources:\" section; sources are displayed separately.\n\
         \n\
         Previous conversation:\n\
         {history}\n\
         Context from {corpus}:\n\
         {context}\n\
         \n\
         User question: {question}\n\
         \n\
         Provide a clear, well-structured answer based on the context above. \
         Do not list sources in your response.",
        corpus = corpus_name,
        history = history_text(history),
        context = context,
        question = question,
    )
}

/// Drop everything from a trailing `Sources:` line onward.
pub fn strip_sources_section(response: &str) -> String {
    let mut kept = Vec::new();
    for line in response.lines() {
        if line.trim().to_lowercase().starts_with("sources:") {
            break;
        }
        kept.push(line);
    }
    kept.join("\n").trim().to_string()
}
