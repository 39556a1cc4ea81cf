use std::sync::Arc;

use crate::db::JobStore;
use crate::services::import::ImportService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub imports: Arc<ImportService>,
    pub jobs: Arc<dyn JobStore>,
}

impl AppState {
    pub fn new(imports: ImportService, jobs: Arc<dyn JobStore>) -> Self {
        Self {
            imports: Arc::new(imports),
            jobs,
        }
    }
}
