//! API server lifecycle: starts/stops the axum HTTP server that serves
//! the diagnosis API.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::router::diagnosis_api_router;
use crate::api::types::ApiContext;

/// Session metadata for a running API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisApiSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running API server.
pub struct DiagnosisApiServer {
    pub session: DiagnosisApiSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl DiagnosisApiServer {
    /// Signal the server to shut down gracefully. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Diagnosis API server shutdown signal sent");
        }
    }

    /// Shut down and wait for in-flight requests to drain.
    pub async fn shutdown_and_wait(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Diagnosis API server task failed: {e}");
            }
        }
    }
}

/// Start the API server on `addr` (port 0 picks an ephemeral port).
///
/// Binds, builds the router, and spawns `axum::serve` in a background
/// tokio task. Returns a handle with session metadata and a shutdown channel.
pub async fn start_diagnosis_api_server(
    ctx: ApiContext,
    addr: SocketAddr,
) -> Result<DiagnosisApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind diagnosis API server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = diagnosis_api_router(ctx);

    let session = DiagnosisApiSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Diagnosis API server received shutdown signal");
        };

        tracing::info!(%addr, "Diagnosis API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Diagnosis API server error: {e}");
        }

        tracing::info!("Diagnosis API server stopped");
    });

    Ok(DiagnosisApiServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use serde_json::json;

    use crate::pipeline::diagnosis::{DiagnosisPipeline, MockDiagnosisBackend};

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    fn test_ctx() -> ApiContext {
        ApiContext::new(DiagnosisPipeline::new(Box::new(
            MockDiagnosisBackend::returning(json!({
                "potentialDiagnoses": ["Bronchitis"],
                "confidenceLevels": [0.7],
                "rationale": "Cough with fever."
            })),
        )))
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let server = start_diagnosis_api_server(test_ctx(), localhost())
            .await
            .expect("server should start");

        assert!(!server.session.session_id.is_empty());
        assert!(server.session.port > 0);

        let url = format!("http://127.0.0.1:{}/api/health", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        drop(resp);

        server.shutdown_and_wait().await;
    }

    #[tokio::test]
    async fn serves_diagnosis_over_http() {
        let mut server = start_diagnosis_api_server(test_ctx(), localhost())
            .await
            .expect("server should start");

        let client = reqwest::Client::new();
        let resp = client
            .post(format!(
                "http://127.0.0.1:{}/api/diagnosis",
                server.session.port
            ))
            .json(&json!({
                "symptoms": "persistent cough and fever",
                "medicalHistory": "asthma since childhood",
                "labResults": ""
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "succeeded");
        assert_eq!(body["result"]["potentialDiagnoses"][0], "Bronchitis");

        server.shutdown();
    }

    #[tokio::test]
    async fn session_has_valid_metadata() {
        let mut server = start_diagnosis_api_server(test_ctx(), localhost())
            .await
            .expect("server should start");

        assert!(!server.session.started_at.is_empty());
        assert!(server.session.server_addr.contains(':'));

        server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start_diagnosis_api_server(test_ctx(), localhost())
            .await
            .expect("server should start");

        server.shutdown();
        server.shutdown(); // Second call should be safe
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let server = start_diagnosis_api_server(test_ctx(), localhost())
            .await
            .expect("server should start");
        let taken = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), server.session.port);

        let err = start_diagnosis_api_server(test_ctx(), taken)
            .await
            .err()
            .expect("second bind should fail");
        assert!(err.contains("Failed to bind"));

        server.shutdown_and_wait().await;
    }
}
