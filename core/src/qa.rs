//! Prompt construction for answer generation.

use crate::model::Document;

/// Retrieval policy used when answering a question.
pub const ANSWER_TOP_K: usize = 3;
pub const ANSWER_MIN_SCORE: f32 = 0.05;

pub const MAX_CONTEXT_CHARS: usize = 4000;
pub const NO_DOCUMENTS_ANSWER: &str = "No relevant documents found to answer this question.";

/// Concatenate ranked documents into a context block of at most
/// [`MAX_CONTEXT_CHARS`] characters (plus a truncation marker).
pub fn build_context(documents: &[(Document, f32)]) -> String {
    let context = documents
        .iter()
        .map(|(doc, _)| format!("[Document: {}]\n{}\n", doc.title, doc.content))
        .collect::<Vec<_>>()
        .join("\n---\n");
    match context.char_indices().nth(MAX_CONTEXT_CHARS) {
        Some((cut, _)) => format!("{}...[truncated]", &context[..cut]),
        None => context,
    }
}

pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question based only on the following context.\n\
         If the answer cannot be found in the context, say \"I cannot find the answer in the provided documents.\"\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}
