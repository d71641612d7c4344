//! Shared application state.
//!
//! Built once at startup and wrapped in `Arc` so axum handlers and the
//! blocking tasks they spawn share the same clients and inference lock.

use std::sync::Arc;

use crate::config::{AppConfig, EmbeddingBackend, LlmProvider};
use crate::crypto::{hash_secret, verify_secret, CryptoError};
use crate::db;
use crate::inference_service::{ActiveOperation, InferenceService};
use crate::pipeline::llm::{GeminiClient, LlmClient, LlmError, OllamaClient};
use crate::pipeline::processor::ReportProcessor;
use crate::pipeline::storage::embedder::OllamaEmbedder;
use crate::pipeline::storage::types::EmbeddingModel;
use crate::pipeline::storage::StorageError;

pub struct CoreState {
    pub config: AppConfig,
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn EmbeddingModel>,
    /// Serialises model work against a local Ollama.
    inference: InferenceService,
    /// Verified against when a login names no account, so a miss costs
    /// the same PBKDF2 work as a hit.
    absent_account_hash: String,
}

impl CoreState {
    /// Build LLM and embedding clients from configuration.
    ///
    /// Access is exclusive whenever anything talks to a local Ollama, since
    /// it keeps a single model resident.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        let llm: Arc<dyn LlmClient> = match config.llm_provider {
            LlmProvider::Ollama => Arc::new(OllamaClient::new(
                &config.ollama_url,
                &config.ollama_model,
                config.llm_timeout_secs,
            )?),
            LlmProvider::Gemini => {
                let key = config.gemini_api_key.as_deref().unwrap_or_default();
                Arc::new(GeminiClient::new(
                    key,
                    &config.gemini_model,
                    config.llm_timeout_secs,
                )?)
            }
        };
        let embedder = build_embedder(&config)?;
        let exclusive = config.llm_provider == LlmProvider::Ollama
            || config.embedding_backend == EmbeddingBackend::Ollama;

        tracing::info!(
            llm = %llm.label(),
            embedder = embedder.model_name(),
            exclusive,
            "Model clients ready"
        );
        Ok(Self::with_clients(config, llm, embedder, exclusive))
    }

    /// State over explicit clients. Tests pass mocks here.
    pub fn with_clients(
        config: AppConfig,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingModel>,
        exclusive: bool,
    ) -> Self {
        Self {
            llm,
            embedder,
            inference: InferenceService::new(exclusive),
            absent_account_hash: hash_secret("", config.pbkdf2_iterations),
            config,
        }
    }

    /// Open a connection to the application database.
    ///
    /// Connections are per request; SQLite in WAL mode lets readers proceed
    /// while an upload transaction is committing.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        Ok(db::open_database(&self.config.database_path)?)
    }

    pub fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }

    pub fn embedder(&self) -> &dyn EmbeddingModel {
        self.embedder.as_ref()
    }

    /// Check a login secret against the stored hash, if the account exists.
    /// Unknown accounts still pay for one verification and never match.
    pub fn verify_login_secret(
        &self,
        secret: &str,
        stored_hash: Option<&str>,
    ) -> Result<bool, CryptoError> {
        match stored_hash {
            Some(hash) => verify_secret(secret, hash),
            None => {
                verify_secret(secret, &self.absent_account_hash)?;
                Ok(false)
            }
        }
    }

        pub fn inference(&self) -> &InferenceService {
        &self.inference
    }

    /// Model operation in flight, for `/health`.
    pub fn current_operation(&self) -> Option<ActiveOperation> {
        self.inference.current_operation()
    }

    /// Upload pipeline bound to this state's clients and chunking settings.
    pub fn processor(&self) -> ReportProcessor<'_, dyn LlmClient + '_, dyn EmbeddingModel + '_> {
        ReportProcessor::new(
            self.llm(),
            self.embedder(),
            &self.inference,
            self.config.chunk_size,
            self.config.chunk_overlap,
        )
    }
}

fn build_embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingModel>, CoreError> {
    match config.embedding_backend {
        EmbeddingBackend::Ollama => Ok(Arc::new(OllamaEmbedder::new(
            &config.ollama_url,
            &config.embedding_model,
            config.llm_timeout_secs,
        )?)),
        #[cfg(feature = "onnx-embeddings")]
        EmbeddingBackend::Onnx => Ok(Arc::new(
            crate::pipeline::storage::embedder::OnnxEmbedder::load(&config.embedding_model_dir)?,
        )),
        #[cfg(not(feature = "onnx-embeddings"))]
        EmbeddingBackend::Onnx => Err(CoreError::Storage(StorageError::ModelInit(
            "built without the onnx-embeddings feature".into(),
        ))),
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("LLM client error: {0}")]
    Llm(#[from] LlmError),
    #[error("Embedding backend error: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::pipeline::llm::MockLlmClient;
    use crate::pipeline::storage::embedder::MockEmbedder;

    /// State over a fresh temp database with scripted clients.
    /// Keep the `TempDir` alive for the duration of the test.
    pub(crate) fn mock_state(llm: MockLlmClient) -> (Arc<CoreState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::for_data_dir(dir.path());
        config.pbkdf2_iterations = 1_000;
        let state = CoreState::with_clients(
            config,
            Arc::new(llm),
            Arc::new(MockEmbedder::new()),
            true,
        );
        state.open_db().unwrap();
        (Arc::new(state), dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference_service::OperationKind;
    use crate::pipeline::llm::MockLlmClient;

    #[test]
    fn open_db_creates_schema() {
        let (state, _dir) = test_support::mock_state(MockLlmClient::new("ok"));
        let conn = state.open_db().unwrap();
        assert!(db::count_tables(&conn).unwrap() >= 8);
        assert!(state.config.database_path.exists());
    }

    #[test]
    fn current_operation_follows_guard() {
        let (state, _dir) = test_support::mock_state(MockLlmClient::new("ok"));
        assert!(state.current_operation().is_none());
        {
            let _guard = state
                .inference()
                .acquire(OperationKind::QuestionAnswering, "mock")
                .unwrap();
            let op = state.current_operation().unwrap();
            assert_eq!(op.kind, OperationKind::QuestionAnswering);
        }
        assert!(state.current_operation().is_none());
    }

    #[test]
    fn processor_borrows_state_clients() {
        let (state, _dir) = test_support::mock_state(MockLlmClient::new("Routine panel."));
        let conn = state.open_db().unwrap();
        let analysis = state
            .processor()
            .analyze_text(
                &conn,
                "cbc.pdf",
                "Hemoglobin 13.5 g/dL",
                crate::pipeline::processor::AnalysisMode::SummaryOnly,
                chrono::Local::now().naive_local(),
            )
            .unwrap();
        assert!(analysis.extracted.is_none());
        assert!(analysis.report_id.is_none());
        assert!(state.current_operation().is_none());
    }

    #[test]
    fn missing_account_never_verifies() {
        let (state, _dir) = test_support::mock_state(MockLlmClient::new("ok"));
        assert!(!state.verify_login_secret("", None).unwrap());
        assert!(!state.verify_login_secret("1234", None).unwrap());
        assert!(state
            .absent_account_hash
            .starts_with(&format!("pbkdf2-sha256${}$", state.config.pbkdf2_iterations)));

        let stored = hash_secret("1234", state.config.pbkdf2_iterations);
        assert!(state.verify_login_secret("1234", Some(&stored)).unwrap());
        assert!(!state.verify_login_secret("4321", Some(&stored)).unwrap());
    }

    #[test]
    fn ollama_config_builds_exclusive_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::from_config(AppConfig::for_data_dir(dir.path())).unwrap();
        assert!(state.inference().is_exclusive());
        assert_eq!(state.llm().label(), "ollama:medgemma");
        assert_eq!(state.embedder().model_name(), "all-minilm");
    }

    #[test]
    fn gemini_without_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::for_data_dir(dir.path());
        config.llm_provider = LlmProvider::Gemini;
        config.gemini_api_key = None;
        assert!(matches!(
            CoreState::from_config(config),
            Err(CoreError::Llm(LlmError::Configuration(_)))
        ));
    }

    #[cfg(not(feature = "onnx-embeddings"))]
    #[test]
    fn onnx_backend_needs_feature() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::for_data_dir(dir.path());
        config.embedding_backend = EmbeddingBackend::Onnx;
        assert!(matches!(
            CoreState::from_config(config),
            Err(CoreError::Storage(StorageError::ModelInit(_)))
        ));
    }
}
