//! Shared application state injected into handlers and middleware.

use std::sync::Arc;

use crate::application::services::{AdmissionPipeline, RateLimitService};
use crate::domain::repositories::ArchiveRepository;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AdmissionPipeline>,
    pub archive: Arc<dyn ArchiveRepository>,
}

impl AppState {
    pub fn new(pipeline: Arc<AdmissionPipeline>, archive: Arc<dyn ArchiveRepository>) -> Self {
        Self { pipeline, archive }
    }

    pub fn rate_limit(&self) -> &Arc<RateLimitService> {
        self.pipeline.rate_limit()
    }
}
