pub mod api; // HTTP surface: router, endpoints, middleware
pub mod config;
pub mod core_state; // Shared clients + inference lock
pub mod crypto; // PIN / password hashing
pub mod db;
pub mod inference_service;
pub mod models;
pub mod pipeline; // PDF → text → LLM fields/summary → chunk index → RAG
pub mod validation;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Errors that stop the service before it can serve requests.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] core_state::CoreError),
    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Server(#[from] api::server::ServerError),
}

/// Load configuration, prepare the database and serve until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    // A missing .env file is normal in production
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    tracing::info!("HealthVault starting v{}", config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    let core = core_state::CoreState::from_config(config)?;

    // Apply migrations once up front so schema problems fail fast.
    core.open_db()?;
    tracing::info!(path = %core.config.database_path.display(), "Database ready");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;
    runtime.block_on(api::server::serve_until_ctrl_c(Arc::new(core)))?;
    Ok(())
}
