use crate::service::TranscriptionService;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TranscriptionService>,
}

impl AppState {
    pub fn new(service: Arc<TranscriptionService>) -> Self {
        Self { service }
    }
}
