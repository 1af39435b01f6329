use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Printers
        .route(
            "/api/v1/printers",
            get(handlers::list_printers).post(handlers::create_printer),
        )
        .route("/api/v1/printers/:id", get(handlers::get_printer))
        // Filaments
        .route(
            "/api/v1/filaments",
            get(handlers::list_filaments).post(handlers::create_filament),
        )
        .route("/api/v1/filaments/:id", get(handlers::get_filament))
        // Print jobs
        .route(
            "/api/v1/print_jobs",
            get(handlers::list_print_jobs).post(handlers::create_print_job),
        )
        .route("/api/v1/print_jobs/:id", get(handlers::get_print_job))
        .route(
            "/api/v1/print_jobs/:id/status",
            post(handlers::update_print_job_status),
        )
        // Cluster
        .route("/cluster/leader", get(handlers::cluster_leader))
        // Internal
        .route("/_internal/cluster/status", get(handlers::cluster_status))
        .route("/_internal/health", get(handlers::health))
        .route("/_internal/snapshot", get(handlers::export_snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
