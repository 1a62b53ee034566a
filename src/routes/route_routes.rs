use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::route_dto::{
    AddStopRequest, AssignVehicleRequest, CreateRouteRequest, RenameRouteRequest,
    RouteStatusRequest, StudentCountRequest,
};
use crate::dto::ApiResponse;
use crate::models::route::Route;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_route_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_routes).post(create_route))
        .route("/by-vehicle/:vehicle_id", get(list_by_vehicle))
        .route("/:id", get(get_route).delete(delete_route))
        .route("/:id/name", put(rename_route))
        .route("/:id/status", put(set_route_status))
        .route("/:id/vehicle", put(assign_vehicle).delete(unassign_vehicle))
        .route("/:id/stops", post(add_stop))
        .route("/:id/stops/:index", delete(remove_stop))
        .route("/:id/stops/:index/students", put(set_student_count))
}

async fn create_route(
    State(state): State<AppState>,
    Json(request): Json<CreateRouteRequest>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.create_route(request).await?;
    Ok(Json(ApiResponse::success_with_message(route, "Route created")))
}

async fn list_routes(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Route>>>, AppError> {
    Ok(Json(ApiResponse::success(state.routes.list().await?)))
}

async fn list_by_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Route>>>, AppError> {
    let routes = state.routes.list_by_vehicle(vehicle_id).await?;
    Ok(Json(ApiResponse::success(routes)))
}

async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    Ok(Json(ApiResponse::success(state.routes.get(id).await?)))
}

async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    state.routes.delete_route(id).await?;
    Ok(Json(ApiResponse::success_with_message(id, "Route deleted")))
}

async fn rename_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameRouteRequest>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.rename(id, &request.name).await?;
    Ok(Json(ApiResponse::success(route)))
}

async fn set_route_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RouteStatusRequest>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.set_status(id, request.status).await?;
    Ok(Json(ApiResponse::success(route)))
}

async fn assign_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignVehicleRequest>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.assign_vehicle(id, request.vehicle_id).await?;
    Ok(Json(ApiResponse::success_with_message(route, "Vehicle assigned")))
}

async fn unassign_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.unassign_vehicle(id).await?;
    Ok(Json(ApiResponse::success(route)))
}

async fn add_stop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddStopRequest>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.add_stop(id, request.index, request.stop).await?;
    Ok(Json(ApiResponse::success(route)))
}

async fn remove_stop(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.remove_stop(id, index).await?;
    Ok(Json(ApiResponse::success(route)))
}

async fn set_student_count(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(request): Json<StudentCountRequest>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state
        .routes
        .set_student_count(id, index, request.student_count)
        .await?;
    Ok(Json(ApiResponse::success(route)))
}
