//! HTTP server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.
//! The binary instead serves in the foreground until Ctrl-C.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::router::api_router;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Metadata for a running server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a server running on a background task.
pub struct ApiServer {
    pub session: ServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Start the server on a background task at `addr`. Port 0 picks a free port.
pub async fn start_server_on(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<ApiServer, ServerError> {
    let listener = bind(addr).await?;
    let addr = listener.local_addr()?;

    let session = ServerSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Local::now().to_rfc3339(),
    };

    let app = api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        session,
        shutdown_tx: Some(shutdown_tx),
    })
}

/// Serve on the configured address until `shutdown` resolves.
pub async fn serve_until<F>(core: Arc<CoreState>, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind(core.config.bind_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, environment = %core.config.environment, "HealthVault API listening");

    axum::serve(
        listener,
        api_router(core).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    tracing::info!("API server stopped");
    Ok(())
}

/// Serve until Ctrl-C.
pub async fn serve_until_ctrl_c(core: Arc<CoreState>) -> Result<(), ServerError> {
    serve_until(core, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
        tracing::info!("Shutdown requested");
    })
    .await
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_state::test_support::mock_state;
    use crate::pipeline::llm::MockLlmClient;

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let (core, _dir) = mock_state(MockLlmClient::new("ok"));
        let mut server = start_server_on(core, localhost())
            .await
            .expect("server should start");

        assert!(!server.session.session_id.is_empty());
        assert!(server.session.port > 0);

        let url = format!("http://127.0.0.1:{}/health", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        // Give server time to stop
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn server_serves_api_routes() {
        let (core, _dir) = mock_state(MockLlmClient::new("ok"));
        let mut server = start_server_on(core, localhost())
            .await
            .expect("server should start");
        let port = server.session.port;

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/nonexistent"))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/patients/login"))
            .header("Content-Type", "application/json")
            .body(r#"{"email":"nobody@example.com","pin":"123456"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        server.shutdown();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let (core, _dir) = mock_state(MockLlmClient::new("ok"));
        let mut first = start_server_on(core.clone(), localhost()).await.unwrap();
        let taken = SocketAddr::from(([127, 0, 0, 1], first.session.port));

        let second = start_server_on(core, taken).await;
        assert!(matches!(second, Err(ServerError::Bind { .. })));
        first.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (core, _dir) = mock_state(MockLlmClient::new("ok"));
        let mut server = start_server_on(core, localhost()).await.unwrap();
        server.shutdown();
        server.shutdown();
    }
}
