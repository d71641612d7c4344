use super::prompt::{build_qa_prompt, NO_CONTEXT_ANSWER, QA_SYSTEM_PROMPT, QA_TEMPERATURE};
use super::types::{RagAnswer, SourceRef, VectorSearch};
use super::RagError;
use crate::pipeline::llm::{GenerationOptions, LlmClient};
use crate::pipeline::safety::{sanitize_question, MAX_QUESTION_LENGTH};
use crate::pipeline::storage::types::EmbeddingModel;

/// Question answering over one report's indexed chunks.
///
/// sanitize → embed → retrieve top-k → prompt → generate
pub struct ReportRagPipeline<'a, G, E, V>
where
    G: LlmClient + ?Sized,
    E: EmbeddingModel + ?Sized,
    V: VectorSearch,
{
    llm: &'a G,
    embedder: &'a E,
    vector_search: &'a V,
    top_k: usize,
}

impl<'a, G, E, V> ReportRagPipeline<'a, G, E, V>
where
    G: LlmClient + ?Sized,
    E: EmbeddingModel + ?Sized,
    V: VectorSearch,
{
    pub fn new(llm: &'a G, embedder: &'a E, vector_search: &'a V, top_k: usize) -> Self {
        Self {
            llm,
            embedder,
            vector_search,
            top_k: top_k.max(1),
        }
    }

    pub fn answer(&self, report_id: &str, question: &str) -> Result<RagAnswer, RagError> {
        let sanitized = sanitize_question(question, MAX_QUESTION_LENGTH);
        if sanitized.text.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let query_embedding = self
            .embedder
            .embed(&sanitized.text)
            .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?;

        let chunks = self
            .vector_search
            .search(report_id, &query_embedding, self.top_k)?;
        if chunks.is_empty() {
            tracing::info!(report_id = %report_id, "No indexed chunks for question");
            return Ok(RagAnswer {
                question: sanitized.text,
                text: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = build_qa_prompt(&sanitized.text, &chunks);
        let text = self.llm.generate(
            QA_SYSTEM_PROMPT,
            &prompt,
            &GenerationOptions::with_temperature(QA_TEMPERATURE),
        )?;

        tracing::info!(
            report_id = %report_id,
            chunks = chunks.len(),
            llm = %self.llm.label(),
            "Question answered"
        );

        Ok(RagAnswer {
            question: sanitized.text,
            text: text.trim().to_string(),
            sources: chunks
                .iter()
                .map(|c| SourceRef {
                    chunk_index: c.chunk_index,
                    score: c.score,
                })
                .collect(),
        })
    }
}
