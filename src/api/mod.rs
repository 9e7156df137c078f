//! HTTP API for the diagnosis pipeline.
//!
//! Routes are nested under `/api/` and wrapped by an audit logger.
//! `diagnosis_api_router()` returns a `Router` that can be mounted on any
//! axum server instance; `server` owns the listener lifecycle.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::diagnosis_api_router;
pub use server::{start_diagnosis_api_server, DiagnosisApiServer, DiagnosisApiSession};
pub use types::ApiContext;
