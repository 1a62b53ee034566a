use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::models::alert::Alert;
use crate::services::overview::{fleet_overview, FleetOverview};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_alert_router() -> Router<AppState> {
    Router::new()
        .route("/", get(pending_alerts))
        .route("/:id/acknowledge", post(acknowledge_alert))
}

pub fn create_overview_router() -> Router<AppState> {
    Router::new().route("/", get(overview))
}

async fn pending_alerts(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Alert>>>, AppError> {
    Ok(Json(ApiResponse::success(state.dispatcher.pending().await?)))
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    let alert = state.dispatcher.acknowledge(id).await?;
    Ok(Json(ApiResponse::success_with_message(alert, "Alert acknowledged")))
}

async fn overview(State(state): State<AppState>) -> Result<Json<ApiResponse<FleetOverview>>, AppError> {
    let overview = fleet_overview(&state.registry, &state.routes, &state.scheduler, Utc::now()).await?;
    Ok(Json(ApiResponse::success(overview)))
}
