pub mod orchestrator;
pub mod prompt;
pub mod retrieval;
pub mod types;

pub use orchestrator::*;
pub use types::*;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::pipeline::llm::LlmError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Question is empty after sanitization")]
    EmptyQuestion,

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
