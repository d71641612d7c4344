use std::sync::Arc;

use super::StorageError;

/// A piece of report text sized for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
}

/// Chunking strategy trait
pub trait Chunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk>;
}

/// Embedding model abstraction
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError>;
    fn dimension(&self) -> usize;
    /// Model identifier, for logs and the health endpoint.
    fn model_name(&self) -> &str;
}

/// Allow `Arc<dyn EmbeddingModel>` to be used as `&impl EmbeddingModel`.
impl EmbeddingModel for Arc<dyn EmbeddingModel> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Vector store abstraction, scoped per report.
pub trait VectorStore {
    fn store_chunks(
        &self,
        report_id: &str,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError>;

    fn delete_by_report(&self, report_id: &str) -> Result<usize, StorageError>;
}
