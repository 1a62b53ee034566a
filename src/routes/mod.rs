//! Rutas HTTP
//!
//! Un router por componente, anidados bajo `/api` con el estado
//! compartido, CORS y trazas de requests.

pub mod alert_routes;
pub mod maintenance_routes;
pub mod route_routes;
pub mod tracking_routes;
pub mod vehicle_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_layer;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/api/routes", route_routes::create_route_router())
        .nest("/api/maintenance", maintenance_routes::create_maintenance_router())
        .nest("/api/tracking", tracking_routes::create_tracking_router())
        .nest("/api/alerts", alert_routes::create_alert_router())
        .nest("/api/overview", alert_routes::create_overview_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "school_fleet",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
