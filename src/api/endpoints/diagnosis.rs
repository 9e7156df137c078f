//! Diagnosis suggestion endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::diagnosis::{suggestion_rows, DiagnosisOutcome, DiagnosisResult, SuggestionRow};

/// Form fields as submitted by the dashboard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisSubmission {
    pub symptoms: String,
    pub medical_history: String,
    #[serde(default)]
    pub lab_results: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiagnosisResponse {
    Succeeded {
        result: DiagnosisResult,
        suggestions: Vec<SuggestionRow>,
    },
    InsufficientInformation {
        message: String,
    },
}

/// `POST /api/diagnosis`: validate, query the model, return suggestions.
///
/// The model call blocks, so each submission runs on its own blocking task.
pub async fn submit(
    State(ctx): State<ApiContext>,
    payload: Result<Json<DiagnosisSubmission>, JsonRejection>,
) -> Result<Json<DiagnosisResponse>, ApiError> {
    let Json(submission) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let pipeline = ctx.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        pipeline.submit_diagnosis_request(
            &submission.symptoms,
            &submission.medical_history,
            &submission.lab_results,
        )
    })
    .await?;

    match outcome {
        DiagnosisOutcome::Succeeded { result } => {
            let suggestions = suggestion_rows(&result);
            Ok(Json(DiagnosisResponse::Succeeded {
                result,
                suggestions,
            }))
        }
        DiagnosisOutcome::InsufficientInformation { message } => {
            Ok(Json(DiagnosisResponse::InsufficientInformation { message }))
        }
        DiagnosisOutcome::ValidationFailed { field_errors, .. } => {
            Err(ApiError::Validation(field_errors))
        }
        DiagnosisOutcome::ProcessingFailed { .. } => Err(ApiError::ProcessingFailed),
    }
}
