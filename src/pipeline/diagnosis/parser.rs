use serde_json::Value;

use super::types::{DiagnosisResult, OutputShape};
use super::DiagnosisError;

/// Locate the JSON object in a model reply and decode it.
///
/// Accepts a ```json fenced block, or else the outermost `{ ... }` span, so a
/// model that wraps its answer in prose or fences still parses.
pub fn extract_json_value(response: &str) -> Result<Value, DiagnosisError> {
    let json_str = extract_json_block(response)?;
    serde_json::from_str(json_str).map_err(|e| DiagnosisError::MalformedResponse(e.to_string()))
}

fn extract_json_block(response: &str) -> Result<&str, DiagnosisError> {
    if let Some(fence_start) = response.find("```json") {
        let content_start = fence_start + "```json".len();
        let content_len = response[content_start..]
            .find("```")
            .ok_or_else(|| DiagnosisError::MalformedResponse("Unclosed JSON block".into()))?;
        return Ok(response[content_start..content_start + content_len].trim());
    }

    let open = response
        .find('{')
        .ok_or_else(|| DiagnosisError::MalformedResponse("No JSON object found".into()))?;
    let close = response
        .rfind('}')
        .filter(|&close| close > open)
        .ok_or_else(|| DiagnosisError::MalformedResponse("Unclosed JSON object".into()))?;

    Ok(&response[open..=close])
}

/// Coerce a backend value into a `DiagnosisResult`.
///
/// Rejects the whole value on any violation; there is no partial result.
pub fn parse_diagnosis_result(value: Value) -> Result<DiagnosisResult, DiagnosisError> {
    OutputShape::diagnosis_result().check(&value)?;

    let result: DiagnosisResult = serde_json::from_value(value)
        .map_err(|e| DiagnosisError::SchemaMismatch(e.to_string()))?;

    check_consistency(&result)?;
    Ok(result)
}

fn check_consistency(result: &DiagnosisResult) -> Result<(), DiagnosisError> {
    if result.potential_diagnoses.len() != result.confidence_levels.len() {
        return Err(DiagnosisError::InconsistentResult(format!(
            "{} diagnoses but {} confidence levels",
            result.potential_diagnoses.len(),
            result.confidence_levels.len()
        )));
    }

    if let Some((index, level)) = result
        .confidence_levels
        .iter()
        .enumerate()
        .find(|(_, level)| !(0.0..=1.0).contains(*level))
    {
        return Err(DiagnosisError::InconsistentResult(format!(
            "confidence level {level} at position {index} is outside [0, 1]"
        )));
    }

    Ok(())
}
