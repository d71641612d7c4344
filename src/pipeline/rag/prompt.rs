use super::types::ScoredChunk;
use crate::pipeline::safety::wrap_question_for_prompt;

/// Returned without calling the LLM when retrieval finds nothing.
pub const NO_CONTEXT_ANSWER: &str = "No relevant information found in the report.";

/// What the model is told to say when the context lacks the answer.
pub const NOT_IN_CONTEXT_PHRASE: &str = "Answer not available in the context";

pub const QA_TEMPERATURE: f32 = 0.3;

pub const QA_SYSTEM_PROMPT: &str = "\
You answer questions about a single medical report using only the excerpts \
provided. Do not provide wrong information and do not speculate beyond the \
excerpts.";

/// Build the question-answering prompt from retrieved chunks.
pub fn build_qa_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Answer the question in detail from the provided context.\n\
         If the answer is not in the context, say \"{NOT_IN_CONTEXT_PHRASE}\".\n\
         Don't provide wrong information.\n\n\
         Context:\n{context}\n\n\
         Question:\n{}\n\n\
         Answer:",
        wrap_question_for_prompt(question)
    )
}
