use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::dto::tracking_dto::TelemetryPushRequest;
use crate::dto::ApiResponse;
use crate::models::location::VehicleLocation;
use crate::services::telemetry::ensure_not_ahead;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};

pub fn create_tracking_router() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations))
        .route("/locations/:vehicle_id", get(get_location))
        .route("/telemetry", post(push_telemetry))
        .route("/stream", get(stream_locations))
}

async fn list_locations(State(state): State<AppState>) -> Json<ApiResponse<Vec<VehicleLocation>>> {
    Json(ApiResponse::success(state.feed.locations().to_vec()))
}

async fn get_location(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleLocation>>, AppError> {
    let location = state
        .feed
        .location(vehicle_id)
        .ok_or_else(|| not_found_error("Location", &vehicle_id.to_string()))?;
    Ok(Json(ApiResponse::success(location)))
}

async fn push_telemetry(
    State(state): State<AppState>,
    Json(request): Json<TelemetryPushRequest>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    request.validate()?;
    let push = state.push_telemetry.as_ref().ok_or_else(|| {
        AppError::Conflict("telemetry push is disabled in simulated mode".to_string())
    })?;

    // Rechazar muestras de vehículos desconocidos
    state.registry.get(request.vehicle_id).await?;

    let now = Utc::now();
    let vehicle_id = request.vehicle_id;
    let sample = request.into_sample(now);
    ensure_not_ahead(&sample, now, state.feed.config().max_clock_skew)?;
    push.push(sample)?;
    Ok(Json(ApiResponse::success(vehicle_id)))
}

/// Server-sent events: un evento `locations` por lote publicado.
/// El stream termina cuando el servidor empieza a apagarse.
async fn stream_locations(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.feed.subscribe();
    let shutdown = state.shutdown_receiver();

    let events = stream::unfold((subscription, shutdown), |(mut subscription, mut shutdown)| async move {
        let batch = tokio::select! {
            biased;
            _ = stopping(&mut shutdown) => return None,
            batch = subscription.recv() => batch?,
        };
        let event = Event::default()
            .event("locations")
            .json_data(&batch)
            .unwrap_or_else(|e| {
                warn!("Error serializando ubicaciones: {}", e);
                Event::default().comment("serialization error")
            });
        Some((Ok(event), (subscription, shutdown)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn stopping(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}
