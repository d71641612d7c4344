//! Access control for model inference.
//!
//! A local Ollama keeps one model resident at a time, so concurrent requests
//! (an upload being processed while a question is asked) force model swaps.
//! With `exclusive` set, every LLM or embedding call holds a process-wide
//! lock for its duration. Hosted providers run unserialised. Either way the
//! service records what is running for `/health`.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

/// What kind of inference is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Embedding report chunks for the similarity index
    ReportIndexing,
    /// LLM report text → structured fields
    ReportExtraction,
    /// LLM report text → prose summary
    ReportSummary,
    /// Embedding a question and generating its answer
    QuestionAnswering,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReportIndexing => write!(f, "Report indexing"),
            Self::ReportExtraction => write!(f, "Report extraction"),
            Self::ReportSummary => write!(f, "Report summary"),
            Self::QuestionAnswering => write!(f, "Question answering"),
        }
    }
}

/// Snapshot of the currently running operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveOperation {
    pub kind: OperationKind,
    pub model: String,
    /// RFC 3339.
    pub started_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceServiceError {
    #[error("Internal lock error")]
    LockPoisoned,
}

pub struct InferenceService {
    exclusive: bool,
    lock: Mutex<()>,
    current_op: Mutex<Option<ActiveOperation>>,
}

impl InferenceService {
    pub fn new(exclusive: bool) -> Self {
        Self {
            exclusive,
            lock: Mutex::new(()),
            current_op: Mutex::new(None),
        }
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Mark an operation as running, blocking first until the model is free
    /// when access is exclusive. Hold the guard for the whole call.
    pub fn acquire(
        &self,
        kind: OperationKind,
        model: &str,
    ) -> Result<InferenceGuard<'_>, InferenceServiceError> {
        let guard = if self.exclusive {
            Some(
                self.lock
                    .lock()
                    .map_err(|_| InferenceServiceError::LockPoisoned)?,
            )
        } else {
            None
        };
        self.set_current_op(kind, model);
        Ok(InferenceGuard {
            _guard: guard,
            service: self,
        })
    }

    /// `None` when idle.
    pub fn current_operation(&self) -> Option<ActiveOperation> {
        self.current_op.lock().ok()?.clone()
    }

    fn set_current_op(&self, kind: OperationKind, model: &str) {
        if let Ok(mut current) = self.current_op.lock() {
            *current = Some(ActiveOperation {
                kind,
                model: model.to_string(),
                started_at: chrono::Utc::now().to_rfc3339(),
            });
        }
    }

    fn clear_current_op(&self) {
        if let Ok(mut current) = self.current_op.lock() {
            *current = None;
        }
    }
}

/// RAII token for one inference call. Dropping it clears the current
/// operation and, when exclusive, releases the lock.
pub struct InferenceGuard<'a> {
    _guard: Option<MutexGuard<'a, ()>>,
    service: &'a InferenceService,
}

impl Drop for InferenceGuard<'_> {
    fn drop(&mut self) {
        // Clear before the inner MutexGuard is dropped so the next holder's
        // state is never wiped.
        self.service.clear_current_op();
    }
}
