use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parser::extract_json_value;
use super::types::{DiagnosisBackend, OutputShape};
use super::DiagnosisError;

/// Upper bound on the `/api/tags` health probe.
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Ollama HTTP client for local LLM inference, bound to one model.
pub struct OllamaDiagnosisBackend {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    probe_timeout_secs: u64,
    temperature: f32,
}

impl OllamaDiagnosisBackend {
    /// Create a backend pointing at an Ollama instance.
    ///
    /// `timeout_secs` bounds the whole generate call; there is no retry.
    pub fn new(
        base_url: &str,
        model: &str,
        timeout_secs: u64,
        temperature: f32,
    ) -> Result<Self, DiagnosisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DiagnosisError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
            probe_timeout_secs: PROBE_TIMEOUT_SECS.min(timeout_secs),
            temperature,
        })
    }

    /// Override the `/api/tags` timeout.
    pub fn with_probe_timeout(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = secs;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of all locally installed models.
    pub fn list_models(&self) -> Result<Vec<String>, DiagnosisError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.probe_timeout_secs))
            .send()
            .map_err(|e| self.map_send_error(e, self.probe_timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DiagnosisError::BackendStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| DiagnosisError::MalformedResponse(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn map_send_error(&self, e: reqwest::Error, timeout_secs: u64) -> DiagnosisError {
        if e.is_timeout() {
            DiagnosisError::Timeout(timeout_secs)
        } else if e.is_connect() {
            DiagnosisError::BackendConnection(self.base_url.clone())
        } else {
            DiagnosisError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    /// JSON schema the reply is constrained to.
    format: Value,
    options: GenerationOptions,
}

#[derive(Serialize)]
struct GenerationOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl DiagnosisBackend for OllamaDiagnosisBackend {
    fn generate(
        &self,
        prompt: &str,
        system: &str,
        shape: &OutputShape,
    ) -> Result<Value, DiagnosisError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: shape.to_json_schema(),
            options: GenerationOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DiagnosisError::BackendStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                DiagnosisError::Timeout(self.timeout_secs)
            } else {
                DiagnosisError::MalformedResponse(e.to_string())
            }
        })?;

        extract_json_value(&parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    /// `medgemma` matches `medgemma` and `medgemma:4b`, not `medgemma2`.
    fn is_model_available(&self) -> Result<bool, DiagnosisError> {
        let tagged = format!("{}:", self.model);
        let models = self.list_models()?;
        Ok(models
            .iter()
            .any(|m| *m == self.model || m.starts_with(&tagged)))
    }
}

// ──────────────────────────────────────────────
// Mock backend
// ──────────────────────────────────────────────

/// What the mock hands back on every call.
#[derive(Debug, Clone)]
enum MockReply {
    Value(Value),
    ConnectionError,
    Status(u16, String),
}

/// Shared record of prompts a `MockDiagnosisBackend` has received.
#[derive(Debug, Clone, Default)]
pub struct PromptLog(Arc<Mutex<Vec<String>>>);

impl PromptLog {
    pub fn count(&self) -> usize {
        self.0.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn last(&self) -> Option<String> {
        self.0.lock().ok().and_then(|p| p.last().cloned())
    }

    fn push(&self, prompt: &str) {
        if let Ok(mut prompts) = self.0.lock() {
            prompts.push(prompt.to_string());
        }
    }
}

/// Mock backend for testing. Returns a configurable reply and records prompts.
pub struct MockDiagnosisBackend {
    reply: MockReply,
    prompts: PromptLog,
}

impl MockDiagnosisBackend {
    /// Always reply with `value`.
    pub fn returning(value: Value) -> Self {
        Self {
            reply: MockReply::Value(value),
            prompts: PromptLog::default(),
        }
    }

    /// Always fail as if the backend were down.
    pub fn unreachable() -> Self {
        Self {
            reply: MockReply::ConnectionError,
            prompts: PromptLog::default(),
        }
    }

    /// Always fail with an HTTP error status.
    pub fn failing_with_status(status: u16, body: &str) -> Self {
        Self {
            reply: MockReply::Status(status, body.to_string()),
            prompts: PromptLog::default(),
        }
    }

    /// Handle to the prompts received, usable after the mock is boxed.
    pub fn prompt_log(&self) -> PromptLog {
        self.prompts.clone()
    }
}

impl DiagnosisBackend for MockDiagnosisBackend {
    fn generate(
        &self,
        prompt: &str,
        _system: &str,
        _shape: &OutputShape,
    ) -> Result<Value, DiagnosisError> {
        self.prompts.push(prompt);
        match &self.reply {
            MockReply::Value(value) => Ok(value.clone()),
            MockReply::ConnectionError => {
                Err(DiagnosisError::BackendConnection("mock://backend".into()))
            }
            MockReply::Status(status, body) => Err(DiagnosisError::BackendStatus {
                status: *status,
                body: body.clone(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn is_model_available(&self) -> Result<bool, DiagnosisError> {
        match &self.reply {
            MockReply::ConnectionError => {
                Err(DiagnosisError::BackendConnection("mock://backend".into()))
            }
            _ => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::diagnosis::{DiagnosisOutcome, DiagnosisPipeline};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    #[test]
    fn mock_returns_configured_value_and_records_prompt() {
        let mock = MockDiagnosisBackend::returning(json!({ "rationale": "ok" }));
        let log = mock.prompt_log();
        let shape = OutputShape::diagnosis_result();

        let value = mock.generate("the prompt", "system", &shape).unwrap();
        assert_eq!(value["rationale"], "ok");
        assert_eq!(log.count(), 1);
        assert_eq!(log.last().as_deref(), Some("the prompt"));
    }

    #[test]
    fn mock_unreachable_fails_with_connection_error() {
        let mock = MockDiagnosisBackend::unreachable();
        let err = mock
            .generate("p", "s", &OutputShape::diagnosis_result())
            .unwrap_err();
        assert!(matches!(err, DiagnosisError::BackendConnection(_)));
    }

    #[test]
    fn mock_status_failure() {
        let mock = MockDiagnosisBackend::failing_with_status(500, "model crashed");
        let err = mock
            .generate("p", "s", &OutputShape::diagnosis_result())
            .unwrap_err();
        assert!(matches!(err, DiagnosisError::BackendStatus { status: 500, .. }));
    }

    #[test]
    fn ollama_backend_constructor() {
        let backend = OllamaDiagnosisBackend::new("http://localhost:11434", "medgemma", 120, 0.2)
            .unwrap();
        assert_eq!(backend.base_url(), "http://localhost:11434");
        assert_eq!(backend.model_name(), "medgemma");
        assert_eq!(backend.timeout_secs, 120);
        assert_eq!(backend.probe_timeout_secs, PROBE_TIMEOUT_SECS);
    }

    #[test]
    fn ollama_backend_trims_trailing_slash() {
        let backend =
            OllamaDiagnosisBackend::new("http://localhost:11434/", "medgemma", 60, 0.2).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:11434");
    }

    #[test]
    fn generate_request_carries_schema_and_disables_streaming() {
        let body = OllamaGenerateRequest {
            model: "medgemma",
            prompt: "p",
            system: "s",
            stream: false,
            format: OutputShape::diagnosis_result().to_json_schema(),
            options: GenerationOptions { temperature: 0.2 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["format"]["type"], "object");
        assert_eq!(json["format"]["required"][0], "potentialDiagnoses");
    }

    /// Serve a fake Ollama on an ephemeral port and return its base URL.
    async fn spawn_fake_ollama(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// The blocking client must be built and dropped off the async runtime.
    async fn call_generate(base_url: String) -> Result<Value, DiagnosisError> {
        tokio::task::spawn_blocking(move || {
            let backend = OllamaDiagnosisBackend::new(&base_url, "medgemma", 5, 0.2)?;
            backend.generate("prompt", "system", &OutputShape::diagnosis_result())
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn generate_against_fake_ollama() {
        let router = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "medgemma");
                assert_eq!(body["stream"], false);
                assert!(body["format"]["properties"]["rationale"].is_object());
                Json(json!({
                    "model": "medgemma",
                    "response": "{\"potentialDiagnoses\":[\"Bronchitis\"],\"confidenceLevels\":[0.7],\"rationale\":\"cough\"}",
                    "done": true
                }))
            }),
        );
        let base_url = spawn_fake_ollama(router).await;

        let value = call_generate(base_url).await.unwrap();
        assert_eq!(value["potentialDiagnoses"][0], "Bronchitis");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn generate_maps_error_status() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async {
                (
                    axum::http::StatusCode::NOT_FOUND,
                    "model 'medgemma' not found",
                )
            }),
        );
        let base_url = spawn_fake_ollama(router).await;

        let err = call_generate(base_url).await.unwrap_err();
        assert!(matches!(
            err,
            DiagnosisError::BackendStatus { status: 404, ref body } if body.contains("not found")
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn generate_rejects_non_json_reply() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { Json(json!({ "response": "I am not sure.", "done": true })) }),
        );
        let base_url = spawn_fake_ollama(router).await;

        let err = call_generate(base_url).await.unwrap_err();
        assert!(matches!(err, DiagnosisError::MalformedResponse(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_models_against_fake_ollama() {
        let router = Router::new().route(
            "/api/tags",
            get(|| async {
                Json(json!({ "models": [{ "name": "medgemma:4b" }, { "name": "llama3:8b" }] }))
            }),
        );
        let base_url = spawn_fake_ollama(router).await;

        let (models, available) = tokio::task::spawn_blocking(move || {
            let backend = OllamaDiagnosisBackend::new(&base_url, "medgemma", 5, 0.2).unwrap();
            (backend.list_models().unwrap(), backend.is_model_available().unwrap())
        })
        .await
        .unwrap();

        assert_eq!(models, vec!["medgemma:4b", "llama3:8b"]);
        assert!(available);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_backend_is_connection_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = call_generate(format!("http://{addr}")).await.unwrap_err();
        assert!(matches!(err, DiagnosisError::BackendConnection(_)));
    }
    #[tokio::test(flavor = "multi_thread")]
    async fn tagged_name_must_match_exactly() {
        let router = Router::new().route(
            "/api/tags",
            get(|| async { Json(json!({ "models": [{ "name": "medgemma2:latest" }] })) }),
        );
        let base_url = spawn_fake_ollama(router).await;

        let (plain, suffixed) = tokio::task::spawn_blocking(move || {
            let plain = OllamaDiagnosisBackend::new(&base_url, "medgemma", 5, 0.2).unwrap();
            let suffixed = OllamaDiagnosisBackend::new(&base_url, "medgemma2", 5, 0.2).unwrap();
            (
                plain.is_model_available().unwrap(),
                suffixed.is_model_available().unwrap(),
            )
        })
        .await
        .unwrap();

        assert!(!plain);
        assert!(suffixed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_generate_times_out_and_fails_processing() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "response": "{}", "done": true }))
            }),
        );
        let base_url = spawn_fake_ollama(router).await;

        let (err, outcome) = tokio::task::spawn_blocking(move || {
            let backend = OllamaDiagnosisBackend::new(&base_url, "medgemma", 1, 0.2).unwrap();
            let err = backend
                .generate("prompt", "system", &OutputShape::diagnosis_result())
                .unwrap_err();

            let pipeline = DiagnosisPipeline::new(Box::new(backend));
            let outcome = pipeline.submit_diagnosis_request(
                "persistent cough and fever",
                "asthma since childhood",
                "",
            );
            (err, outcome)
        })
        .await
        .unwrap();

        assert!(matches!(err, DiagnosisError::Timeout(1)));
        assert!(matches!(outcome, DiagnosisOutcome::ProcessingFailed { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn hung_tags_endpoint_hits_probe_timeout() {
        let router = Router::new().route(
            "/api/tags",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "models": [] }))
            }),
        );
        let base_url = spawn_fake_ollama(router).await;

        let (err, elapsed) = tokio::task::spawn_blocking(move || {
            let backend = OllamaDiagnosisBackend::new(&base_url, "medgemma", 30, 0.2)
                .unwrap()
                .with_probe_timeout(1);
            let started = std::time::Instant::now();
            let err = backend.is_model_available().unwrap_err();
            (err, started.elapsed())
        })
        .await
        .unwrap();

        assert!(matches!(err, DiagnosisError::Timeout(1)));
        assert!(elapsed < Duration::from_secs(3));
    }
}
