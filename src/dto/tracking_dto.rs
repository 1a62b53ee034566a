use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::location::{ReportedMotion, TelemetrySample};
use crate::utils::geo::GeoPoint;
use crate::utils::validation::{validate_latitude, validate_longitude};

// Muestra empujada por un dispositivo
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TelemetryPushRequest {
    pub vehicle_id: Uuid,

    #[validate(custom = "validate_latitude")]
    pub latitude: f64,

    #[validate(custom = "validate_longitude")]
    pub longitude: f64,

    #[validate(range(min = 0.0, max = 200.0))]
    pub speed_kmh: f64,

    pub motion: ReportedMotion,

    /// Hora del dispositivo; hora del servidor si se omite
    pub timestamp: Option<DateTime<Utc>>,
}

impl TelemetryPushRequest {
    pub fn into_sample(self, received_at: DateTime<Utc>) -> TelemetrySample {
        TelemetrySample {
            vehicle_id: self.vehicle_id,
            position: GeoPoint::new(self.latitude, self.longitude),
            speed_kmh: self.speed_kmh,
            motion: self.motion,
            timestamp: self.timestamp.unwrap_or(received_at),
        }
    }
}
