pub mod health;
pub mod imports;
pub mod metrics;

use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

/// API routes without the metrics endpoint or HTTP layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/imports/persons", post(imports::submit_import))
        .route("/api/imports/persons/{id}", get(imports::get_import_status))
        .with_state(state)
}
