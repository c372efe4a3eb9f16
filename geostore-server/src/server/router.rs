use super::handlers::{self, AppState};
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the Axum router with all endpoints
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Auth stub
        .route("/api/auth/login", post(handlers::login))
        // Record REST API endpoints
        .route(
            "/api/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route("/api/records/{id}", delete(handlers::delete_record))
        // Replication introspection
        .route("/api/replication/status", get(handlers::replication_status))
        .route("/api/latency", get(handlers::measure_latency))
        .route("/api/region", get(handlers::client_region))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
