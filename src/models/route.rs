//! Modelo de Route
//!
//! Este módulo contiene el struct Route con su secuencia ordenada de paradas.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

/// Estado de la ruta
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Active,
    Inactive,
}

/// Tipo de recorrido
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TripKind {
    #[default]
    Pickup,
    Drop,
    Both,
}

/// Parada de una ruta
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub name: String,
    pub location: GeoPoint,
    pub scheduled_time: Option<NaiveTime>,
    pub student_count: u32,
}

/// Route principal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub stops: Vec<Stop>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub vehicle_id: Option<Uuid>,
    pub status: RouteStatus,
    pub trip_kind: TripKind,
    pub distance_km: Option<f64>,
    pub estimated_duration_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    /// Total de estudiantes asignados a todas las paradas
    pub fn total_students(&self) -> u32 {
        self.stops.iter().map(|s| s.student_count).sum()
    }

    pub fn is_active(&self) -> bool {
        self.status == RouteStatus::Active
    }

    /// Próxima parada respecto a una hora local: la primera cuya hora
    /// programada aún no llegó, o la primera parada si ninguna califica.
    pub fn next_stop(&self, local_time: NaiveTime) -> Option<&Stop> {
        self.stops
            .iter()
            .find(|stop| stop.scheduled_time.map_or(false, |t| t > local_time))
            .or_else(|| self.stops.first())
    }
}
