use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::vehicle_dto::{RegisterVehicleRequest, UpdateVehicleRequest, UpdateVehicleStatusRequest};
use crate::dto::ApiResponse;
use crate::models::vehicle::{Vehicle, VehicleFilter};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(register_vehicle))
        .route(
            "/:id",
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
        .route("/:id/status", put(update_vehicle_status))
}

async fn register_vehicle(
    State(state): State<AppState>,
    Json(request): Json<RegisterVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let vehicle = state.registry.register(request).await?;
    Ok(Json(ApiResponse::success_with_message(
        vehicle,
        "Vehicle registered",
    )))
}

async fn list_vehicles(
    State(state): State<AppState>,
    Query(filter): Query<VehicleFilter>,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, AppError> {
    let vehicles = state.registry.list(&filter).await?;
    Ok(Json(ApiResponse::success(vehicles)))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let vehicle = state.registry.get(id).await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let vehicle = state.registry.update_details(id, request).await?;
    Ok(Json(ApiResponse::success_with_message(vehicle, "Vehicle updated")))
}

async fn update_vehicle_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleStatusRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let vehicle = state.registry.update_status(id, request.status).await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    state.registry.remove(id).await?;
    Ok(Json(ApiResponse::success_with_message(id, "Vehicle removed")))
}
