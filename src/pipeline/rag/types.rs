use serde::Serialize;

use super::RagError;

/// A chunk with its relevance score (from vector search).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk_index: usize,
    pub content: String,
    pub score: f32,
}

/// Which chunk backed an answer, and how closely it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub chunk_index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagAnswer {
    /// The question after sanitization, as embedded and prompted.
    pub question: String,
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// Similarity search over one report's chunks.
pub trait VectorSearch {
    fn search(
        &self,
        report_id: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError>;
}
