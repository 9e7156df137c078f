pub mod types;
pub mod validation;
pub mod prompt;
pub mod parser;
pub mod ollama;
pub mod policy;
pub mod summary;
pub mod orchestrator;

pub use types::*;
pub use validation::*;
pub use prompt::*;
pub use parser::*;
pub use ollama::*;
pub use policy::*;
pub use summary::*;
pub use orchestrator::*;

use thiserror::Error;

/// Everything that can go wrong between a validated request and a usable result.
///
/// None of these reach the caller verbatim: the orchestrator collapses them
/// into `DiagnosisOutcome::ProcessingFailed` and logs the detail.
#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("Model backend is not reachable at {0}")]
    BackendConnection(String),

    #[error("Model backend returned error (status {status}): {body}")]
    BackendStatus { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model backend timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model output does not match the expected shape: {0}")]
    SchemaMismatch(String),

    #[error("Model output is internally inconsistent: {0}")]
    InconsistentResult(String),
}
