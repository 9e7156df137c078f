pub mod api;
pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

use crate::api::{start_diagnosis_api_server, ApiContext};
use crate::config::ServiceConfig;
use crate::pipeline::diagnosis::{DiagnosisPipeline, OllamaDiagnosisBackend};

/// Initialize tracing. `RUST_LOG` wins over the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Build the production pipeline: Ollama backend behind the diagnosis stages.
///
/// Blocking: constructs a `reqwest::blocking` client.
pub fn build_pipeline(config: &ServiceConfig) -> Result<DiagnosisPipeline, String> {
    let backend = OllamaDiagnosisBackend::new(
        &config.ollama_url,
        &config.model,
        config.timeout_secs,
        config.temperature,
    )
    .map_err(|e| format!("Cannot create model backend: {e}"))?;

    Ok(DiagnosisPipeline::new(Box::new(backend)))
}

/// Run the service until ctrl-c.
pub async fn run() -> Result<(), String> {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServiceConfig::from_env().map_err(|e| format!("Invalid configuration: {e}"))?;
    tracing::info!(
        ollama_url = %config.ollama_url,
        model = %config.model,
        timeout_secs = config.timeout_secs,
        "Model backend configured"
    );

    let pipeline_config = config.clone();
    let pipeline = tokio::task::spawn_blocking(move || build_pipeline(&pipeline_config))
        .await
        .map_err(|e| format!("Task failed: {e}"))??;

    let server = start_diagnosis_api_server(ApiContext::new(pipeline), config.bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Cannot listen for shutdown signal: {e}"))?;

    tracing::info!("Shutdown requested");
    server.shutdown_and_wait().await;
    Ok(())
}
