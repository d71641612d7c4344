pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod types;

pub use orchestrator::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

use crate::pipeline::llm::LlmError;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Report text is empty")]
    EmptyInput,
}
