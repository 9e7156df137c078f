use super::types::{DiagnosisOutcome, DiagnosisResult};

pub const INSUFFICIENT_INFORMATION_MESSAGE: &str = "The AI could not determine a potential diagnosis based on the provided information. Please provide more details.";

/// Decide what a successfully parsed result means for the caller.
///
/// An empty suggestion list is not a failure: the caller should ask for more
/// detail. Anything else passes through untouched, in backend order.
pub fn apply_result_policy(result: DiagnosisResult) -> DiagnosisOutcome {
    if result.potential_diagnoses.is_empty() {
        return DiagnosisOutcome::InsufficientInformation {
            message: INSUFFICIENT_INFORMATION_MESSAGE.to_string(),
        };
    }
    DiagnosisOutcome::Succeeded { result }
}
