use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::dto::maintenance_dto::{
    ClassificationQuery, CompleteMaintenanceRequest, CostReportQuery, DueQuery,
    MonthlyCostQuery, ScheduleMaintenanceRequest,
};
use crate::dto::ApiResponse;
use crate::models::maintenance::{Classification, MaintenanceRecord, VehicleCost, YearMonth};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_maintenance_router() -> Router<AppState> {
    Router::new()
        .route(
            "/vehicles/:vehicle_id",
            get(list_vehicle_records).post(schedule_maintenance),
        )
        .route("/records/:id", get(get_record))
        .route("/records/:id/complete", post(complete_maintenance))
        .route("/classification", get(classify))
        .route("/due", get(due_within))
        .route("/cost", get(monthly_cost))
        .route("/cost/report", get(monthly_cost_report))
        .route("/cost/totals", get(total_cost_by_vehicle))
}

#[derive(Debug, Serialize)]
struct MonthlyCost {
    vehicle_id: Uuid,
    month: YearMonth,
    total: Decimal,
}

async fn schedule_maintenance(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
    Json(request): Json<ScheduleMaintenanceRequest>,
) -> Result<Json<ApiResponse<MaintenanceRecord>>, AppError> {
    let record = state.scheduler.schedule(vehicle_id, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        record,
        "Maintenance scheduled",
    )))
}

async fn list_vehicle_records(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MaintenanceRecord>>>, AppError> {
    let records = state.scheduler.list_by_vehicle(vehicle_id).await?;
    Ok(Json(ApiResponse::success(records)))
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MaintenanceRecord>>, AppError> {
    Ok(Json(ApiResponse::success(state.scheduler.get(id).await?)))
}

async fn complete_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteMaintenanceRequest>,
) -> Result<Json<ApiResponse<MaintenanceRecord>>, AppError> {
    let record = state.scheduler.complete(id, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        record,
        "Maintenance completed",
    )))
}

async fn classify(
    State(state): State<AppState>,
    Query(query): Query<ClassificationQuery>,
) -> Result<Json<ApiResponse<Classification>>, AppError> {
    let now = query.now.unwrap_or_else(Utc::now);
    Ok(Json(ApiResponse::success(state.scheduler.classify(now).await?)))
}

async fn due_within(
    State(state): State<AppState>,
    Query(query): Query<DueQuery>,
) -> Result<Json<ApiResponse<Vec<MaintenanceRecord>>>, AppError> {
    let now = query.now.unwrap_or_else(Utc::now);
    let days = query.days.unwrap_or(state.config.warn_threshold_days);
    Ok(Json(ApiResponse::success(
        state.scheduler.due_within(now, days).await?,
    )))
}

async fn monthly_cost(
    State(state): State<AppState>,
    Query(query): Query<MonthlyCostQuery>,
) -> Result<Json<ApiResponse<MonthlyCost>>, AppError> {
    let total = state
        .scheduler
        .monthly_cost(query.vehicle_id, query.month)
        .await?;
    Ok(Json(ApiResponse::success(MonthlyCost {
        vehicle_id: query.vehicle_id,
        month: query.month,
        total,
    })))
}

async fn monthly_cost_report(
    State(state): State<AppState>,
    Query(query): Query<CostReportQuery>,
) -> Result<Json<ApiResponse<Vec<VehicleCost>>>, AppError> {
    let report = state.scheduler.monthly_cost_report(query.month).await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn total_cost_by_vehicle(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<VehicleCost>>>, AppError> {
    let totals = state.scheduler.total_cost_by_vehicle().await?;
    Ok(Json(ApiResponse::success(totals)))
}
