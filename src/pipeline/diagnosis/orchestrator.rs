use uuid::Uuid;

use super::parser::parse_diagnosis_result;
use super::policy::apply_result_policy;
use super::prompt::{build_diagnosis_prompt, DIAGNOSIS_SYSTEM_PROMPT};
use super::types::{
    BackendHealth, DiagnosisBackend, DiagnosisOutcome, DiagnosisRequest, DiagnosisResult,
    OutputShape,
};
use super::validation::{error_messages, validate_request};
use super::DiagnosisError;

pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed.";

pub const PROCESSING_FAILED_MESSAGE: &str =
    "An unexpected error occurred while processing the diagnosis. Please try again.";

/// Runs one diagnosis submission end to end:
/// validate → prompt → backend → parse → result policy
///
/// Holds no per-request state; a single instance is shared across requests.
pub struct DiagnosisPipeline {
    backend: Box<dyn DiagnosisBackend + Send + Sync>,
    shape: OutputShape,
}

impl DiagnosisPipeline {
    pub fn new(backend: Box<dyn DiagnosisBackend + Send + Sync>) -> Self {
        Self {
            backend,
            shape: OutputShape::diagnosis_result(),
        }
    }

    /// Submit raw form values. Never panics on backend misbehaviour and never
    /// returns an error: every path ends in a terminal `DiagnosisOutcome`.
    pub fn submit_diagnosis_request(
        &self,
        symptoms: &str,
        medical_history: &str,
        lab_results: &str,
    ) -> DiagnosisOutcome {
        let request_id = Uuid::new_v4();
        tracing::debug!(
            request_id = %request_id,
            symptoms_len = symptoms.len(),
            history_len = medical_history.len(),
            labs_len = lab_results.len(),
            "Diagnosis request received"
        );

        let outcome = match validate_request(symptoms, medical_history, lab_results) {
            Err(field_errors) => {
                tracing::info!(
                    request_id = %request_id,
                    violations = field_errors.len(),
                    "Diagnosis request rejected by validation"
                );
                DiagnosisOutcome::ValidationFailed {
                    messages: error_messages(&field_errors),
                    field_errors,
                }
            }
            Ok(request) => match self.invoke_model(&request, &request_id) {
                Ok(result) => apply_result_policy(result),
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        error = %e,
                        "Diagnosis model call failed"
                    );
                    DiagnosisOutcome::ProcessingFailed {
                        message: PROCESSING_FAILED_MESSAGE.to_string(),
                    }
                }
            },
        };

        tracing::info!(
            request_id = %request_id,
            state = outcome.terminal_state(),
            "Diagnosis request completed"
        );
        outcome
    }

    /// Probe the backend without sending a prompt. Blocking.
    pub fn check_backend(&self) -> BackendHealth {
        let model = self.backend.model_name().to_string();
        match self.backend.is_model_available() {
            Ok(model_available) => BackendHealth {
                model,
                reachable: true,
                model_available,
            },
            Err(e) => {
                tracing::debug!(error = %e, "Model backend health probe failed");
                BackendHealth {
                    model,
                    reachable: false,
                    model_available: false,
                }
            }
        }
    }

    /// Single attempt; the backend's own timeout bounds it.
    fn invoke_model(
        &self,
        request: &DiagnosisRequest,
        request_id: &Uuid,
    ) -> Result<DiagnosisResult, DiagnosisError> {
        let prompt = build_diagnosis_prompt(request);
        tracing::debug!(request_id = %request_id, prompt_len = prompt.len(), "Invoking model");

        let value = self
            .backend
            .generate(&prompt, DIAGNOSIS_SYSTEM_PROMPT, &self.shape)?;
        parse_diagnosis_result(value)
    }
}
