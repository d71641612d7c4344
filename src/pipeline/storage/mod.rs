pub mod chunker;
pub mod embedder;
pub mod types;
pub mod vectordb;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Vector DB error: {0}")]
    VectorDb(String),

    #[error("Embedding service unreachable at {0}")]
    EmbeddingConnection(String),

    #[error("Embedding model not found: {0}")]
    ModelNotFound(std::path::PathBuf),

    #[error("Embedding model initialization: {0}")]
    ModelInit(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),
}
