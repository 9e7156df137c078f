//! Shared types for the HTTP API layer.

use std::sync::Arc;

use crate::pipeline::diagnosis::DiagnosisPipeline;

/// Shared context for all API routes and middleware.
///
/// The pipeline is stateless between requests, so one instance is shared
/// read-only by every handler.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<DiagnosisPipeline>,
}

impl ApiContext {
    pub fn new(pipeline: DiagnosisPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
