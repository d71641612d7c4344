//! Text generation backends.
//!
//! Every backend is blocking; async callers go through `spawn_blocking`.

pub mod gemini;
pub mod mock;
pub mod ollama;

pub use gemini::GeminiClient;
pub use mock::MockLlmClient;
pub use ollama::OllamaClient;

use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM service unreachable at {0}")]
    Connection(String),

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM service returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed LLM response: {0}")]
    Response(String),

    #[error("LLM configuration error: {0}")]
    Configuration(String),
}

/// Sampling controls passed with each request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            max_output_tokens: None,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::with_temperature(0.3)
    }
}

/// A model that turns a system instruction plus a prompt into text.
pub trait LlmClient: Send + Sync {
    fn generate(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError>;

    /// `provider:model`, for logs and the health endpoint.
    fn label(&self) -> String;
}

impl LlmClient for Arc<dyn LlmClient> {
    fn generate(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        (**self).generate(system, prompt, options)
    }

    fn label(&self) -> String {
        (**self).label()
    }
}

/// Map a reqwest send failure the same way for every backend.
pub(crate) fn map_send_error(err: reqwest::Error, endpoint: &str, timeout_secs: u64) -> LlmError {
    if err.is_connect() {
        LlmError::Connection(endpoint.to_string())
    } else if err.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else {
        LlmError::Connection(format!("{endpoint}: {err}"))
    }
}
