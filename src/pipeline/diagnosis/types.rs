use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::DiagnosisError;

/// One of the three inputs on the diagnosis form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestField {
    Symptoms,
    MedicalHistory,
    LabResults,
}

impl RequestField {
    /// Wire name of the field, as submitted by the form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestField::Symptoms => "symptoms",
            RequestField::MedicalHistory => "medicalHistory",
            RequestField::LabResults => "labResults",
        }
    }
}

/// A single violated input rule, tied to the field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: RequestField,
    pub message: String,
}

/// Validated clinical text bundle. Only obtainable through `validate_request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisRequest {
    symptoms: String,
    medical_history: String,
    lab_results: String,
}

impl DiagnosisRequest {
    pub(super) fn from_validated(
        symptoms: String,
        medical_history: String,
        lab_results: String,
    ) -> Self {
        Self {
            symptoms,
            medical_history,
            lab_results,
        }
    }

    pub fn symptoms(&self) -> &str {
        &self.symptoms
    }

    pub fn medical_history(&self) -> &str {
        &self.medical_history
    }

    /// May be empty.
    pub fn lab_results(&self) -> &str {
        &self.lab_results
    }
}

/// Structured suggestion returned by the model.
///
/// `potential_diagnoses[i]` is scored by `confidence_levels[i]`; the parser
/// rejects any reply where the two lists differ in length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub potential_diagnoses: Vec<String>,
    pub confidence_levels: Vec<f64>,
    pub rationale: String,
}

/// Terminal state of a single diagnosis submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiagnosisOutcome {
    ValidationFailed {
        messages: Vec<String>,
        field_errors: Vec<FieldError>,
    },
    ProcessingFailed {
        message: String,
    },
    InsufficientInformation {
        message: String,
    },
    Succeeded {
        result: DiagnosisResult,
    },
}

impl DiagnosisOutcome {
    /// Name of the terminal state, used in logs.
    pub fn terminal_state(&self) -> &'static str {
        match self {
            DiagnosisOutcome::ValidationFailed { .. } => "rejected",
            DiagnosisOutcome::ProcessingFailed { .. } => "failed",
            DiagnosisOutcome::InsufficientInformation { .. } => "empty",
            DiagnosisOutcome::Succeeded { .. } => "succeeded",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DiagnosisOutcome::Succeeded { .. })
    }
}

// ──────────────────────────────────────────────
// Output shape handed to the backend
// ──────────────────────────────────────────────

/// Primitive kind of a single output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    StringArray,
    /// Numbers in `[0, 1]`. The bound is advertised in the schema; the parser
    /// enforces it on the reply.
    ConfidenceArray,
}

impl FieldKind {
    fn json_schema(&self) -> Value {
        match self {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
            FieldKind::ConfidenceArray => json!({
                "type": "array",
                "items": { "type": "number", "minimum": 0, "maximum": 1 }
            }),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldKind::ConfidenceArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_number)),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::StringArray => "an array of strings",
            FieldKind::ConfidenceArray => "an array of numbers between 0 and 1",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputField {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Target structure the backend is asked to produce. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputShape {
    pub fields: Vec<OutputField>,
}

impl OutputShape {
    /// The three-key shape of `DiagnosisResult`.
    pub fn diagnosis_result() -> Self {
        Self {
            fields: vec![
                OutputField {
                    name: "potentialDiagnoses",
                    kind: FieldKind::StringArray,
                },
                OutputField {
                    name: "confidenceLevels",
                    kind: FieldKind::ConfidenceArray,
                },
                OutputField {
                    name: "rationale",
                    kind: FieldKind::String,
                },
            ],
        }
    }

    /// JSON Schema object suitable for Ollama's `format` parameter.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(field.name.to_string(), field.kind.json_schema());
        }
        let required: Vec<&str> = self.fields.iter().map(|f| f.name).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check that `value` is an object carrying every field with the right kind.
    ///
    /// Extra keys are tolerated; they are dropped at deserialization.
    pub fn check(&self, value: &Value) -> Result<(), DiagnosisError> {
        let object = value.as_object().ok_or_else(|| {
            DiagnosisError::SchemaMismatch("top-level value is not an object".into())
        })?;

        for field in &self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) => {
                    return Err(DiagnosisError::SchemaMismatch(format!(
                        "missing required key '{}'",
                        field.name
                    )))
                }
                Some(v) if !field.kind.matches(v) => {
                    return Err(DiagnosisError::SchemaMismatch(format!(
                        "key '{}' must be {}",
                        field.name,
                        field.kind.describe()
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Reachability of the model backend, as reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub model: String,
    pub reachable: bool,
    pub model_available: bool,
}

/// Generative text backend abstraction (allows mocking).
///
/// Implementations return the model's reply as a JSON value; conformance to
/// `shape` is re-checked by the parser, never trusted.
pub trait DiagnosisBackend {
    fn generate(
        &self,
        prompt: &str,
        system: &str,
        shape: &OutputShape,
    ) -> Result<Value, DiagnosisError>;

    /// Name of the model requests are sent to.
    fn model_name(&self) -> &str;

    fn is_model_available(&self) -> Result<bool, DiagnosisError>;
}
