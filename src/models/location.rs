//! Modelos de seguimiento en vivo
//!
//! Muestras crudas de telemetría y la última posición conocida de cada
//! vehículo. Nada de esto se persiste como historial.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

/// Estado de movimiento de un vehículo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Moving,
    Stopped,
    Offline,
}

/// Estado reportado por el dispositivo (un dispositivo nunca se reporta offline)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportedMotion {
    Moving,
    Stopped,
}

impl From<ReportedMotion> for MovementStatus {
    fn from(motion: ReportedMotion) -> Self {
        match motion {
            ReportedMotion::Moving => MovementStatus::Moving,
            ReportedMotion::Stopped => MovementStatus::Stopped,
        }
    }
}

/// Muestra cruda de telemetría
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    pub vehicle_id: Uuid,
    pub position: GeoPoint,
    pub speed_kmh: f64,
    pub motion: ReportedMotion,
    pub timestamp: DateTime<Utc>,
}

/// Última ubicación conocida de un vehículo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleLocation {
    pub vehicle_id: Uuid,
    pub position: GeoPoint,
    pub speed_kmh: f64,
    pub status: MovementStatus,
    /// Timestamp de la última muestra aceptada
    pub timestamp: DateTime<Utc>,
    /// Momento (reloj del servidor) en que el feed aceptó esa muestra
    pub accepted_at: DateTime<Utc>,
    pub next_stop: Option<String>,
    pub eta: Option<DateTime<Utc>>,
    /// Momento en que el feed marcó el vehículo como offline
    pub offline_since: Option<DateTime<Utc>>,
}

/// Lectura inconsistente entre velocidad y estado reportado
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Anomaly {
    pub vehicle_id: Uuid,
    pub description: String,
    pub observed_at: DateTime<Utc>,
}

/// Resultado de un tick del feed
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub at: Option<DateTime<Utc>>,
    pub processed: usize,
    pub accepted: Vec<Uuid>,
    pub duplicates: Vec<Uuid>,
    pub rejected_stale: Vec<Uuid>,
    pub went_offline: Vec<Uuid>,
    pub anomalies: Vec<Anomaly>,
    /// Errores aislados por vehículo (id, mensaje)
    pub errors: Vec<(Uuid, String)>,
    /// Snapshot publicado al final del tick
    pub locations: Vec<VehicleLocation>,
}
