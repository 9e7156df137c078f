// Input rules for the diagnosis form.
// Every violated rule is reported, in field order.

use super::types::{DiagnosisRequest, FieldError, RequestField};

/// Minimum characters (after trimming) for symptoms and medical history.
pub const MIN_FIELD_CHARS: usize = 10;

/// Maximum characters (after trimming) accepted for any single field.
pub const MAX_FIELD_CHARS: usize = 10_000;

pub const SYMPTOMS_TOO_SHORT: &str = "Please describe symptoms in at least 10 characters.";
pub const MEDICAL_HISTORY_TOO_SHORT: &str =
    "Please provide medical history of at least 10 characters.";

/// Validate raw form values into a `DiagnosisRequest`.
///
/// Pure function. On failure returns every violation, not just the first.
pub fn validate_request(
    symptoms: &str,
    medical_history: &str,
    lab_results: &str,
) -> Result<DiagnosisRequest, Vec<FieldError>> {
    let symptoms = symptoms.trim();
    let medical_history = medical_history.trim();
    let lab_results = lab_results.trim();

    let mut errors = Vec::new();

    for (field, value, too_short) in [
        (RequestField::Symptoms, symptoms, Some(SYMPTOMS_TOO_SHORT)),
        (RequestField::MedicalHistory, medical_history, Some(MEDICAL_HISTORY_TOO_SHORT)),
        (RequestField::LabResults, lab_results, None),
    ] {
        let len = char_len(value);
        match too_short {
            Some(message) if len < MIN_FIELD_CHARS => errors.push(FieldError {
                field,
                message: message.to_string(),
            }),
            _ if len > MAX_FIELD_CHARS => errors.push(too_long(field)),
            _ => {}
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(DiagnosisRequest::from_validated(
        symptoms.to_string(),
        medical_history.to_string(),
        lab_results.to_string(),
    ))
}

/// Flatten field errors into display messages, preserving order.
pub fn error_messages(errors: &[FieldError]) -> Vec<String> {
    errors.iter().map(|e| e.message.clone()).collect()
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn too_long(field: RequestField) -> FieldError {
    let label = match field {
        RequestField::Symptoms => "Symptoms",
        RequestField::MedicalHistory => "Medical history",
        RequestField::LabResults => "Lab results",
    };
    FieldError {
        field,
        message: format!("{label} must be at most {MAX_FIELD_CHARS} characters."),
    }
}
