use super::types::DiagnosisRequest;

pub const DIAGNOSIS_SYSTEM_PROMPT: &str = r#"
You are an AI-powered diagnostic-assistance tool. Your role is to help doctors
identify potential diagnoses from the clinical information they provide.
You do not replace clinical judgement; your suggestions are reviewed by a clinician.

RULES:
1. Base every suggestion ONLY on the symptoms, medical history and lab results given.
2. Give a confidence value between 0 and 1 for each diagnosis you suggest.
3. If the information is insufficient to suggest anything, return an empty list.
4. Output MUST be a single valid JSON object and nothing else.
"#;

/// Shown in place of lab results when the field was left empty.
pub const NO_LAB_RESULTS: &str = "None provided";

/// Build the diagnosis prompt for a validated request.
pub fn build_diagnosis_prompt(request: &DiagnosisRequest) -> String {
    let lab_results = if request.lab_results().is_empty() {
        NO_LAB_RESULTS
    } else {
        request.lab_results()
    };
    let symptoms = request.symptoms();
    let medical_history = request.medical_history();

    format!(
        r#"Based on the provided symptoms, medical history, and lab results, suggest a list of potential diagnoses.
Provide a confidence level (0 to 1) for each diagnosis and a brief rationale.

<symptoms>
{symptoms}
</symptoms>

<medical_history>
{medical_history}
</medical_history>

<lab_results>
{lab_results}
</lab_results>

Format your response as a JSON object with exactly the following keys:
- potentialDiagnoses: an array of potential diagnoses, most likely first.
- confidenceLevels: an array of confidence levels (0 to 1), one per diagnosis, in the same order.
- rationale: a brief rationale for the suggested diagnoses.

```json
{{
  "potentialDiagnoses": ["diagnosis"],
  "confidenceLevels": [0.0],
  "rationale": "text"
}}
```
"#
    )
}
