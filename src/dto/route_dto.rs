use chrono::NaiveTime;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::route::{RouteStatus, TripKind};
use crate::utils::validation::{validate_latitude, validate_longitude, validate_not_blank};

// Parada de una ruta
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StopRequest {
    #[validate(custom = "validate_not_blank", length(max = 100))]
    pub name: String,

    #[validate(custom = "validate_latitude")]
    pub latitude: f64,

    #[validate(custom = "validate_longitude")]
    pub longitude: f64,

    pub scheduled_time: Option<NaiveTime>,

    #[serde(default)]
    pub student_count: u32,
}

// Request para crear una ruta
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRouteRequest {
    #[validate(custom = "validate_not_blank", length(max = 100))]
    pub name: String,

    #[serde(default)]
    pub stops: Vec<StopRequest>,

    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,

    pub vehicle_id: Option<Uuid>,

    #[serde(default)]
    pub trip_kind: TripKind,

    #[validate(range(min = 0.0))]
    pub distance_km: Option<f64>,

    pub estimated_duration_minutes: Option<u32>,
}

// Request para insertar una parada en un índice explícito
#[derive(Debug, Clone, Deserialize)]
pub struct AddStopRequest {
    /// Posición de inserción; al final si se omite
    pub index: Option<usize>,
    pub stop: StopRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignVehicleRequest {
    pub vehicle_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentCountRequest {
    pub student_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteStatusRequest {
    pub status: RouteStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameRouteRequest {
    pub name: String,
}
