//! Fuentes de telemetría
//!
//! `TelemetrySource` abstrae de dónde sale la última muestra de cada
//! vehículo. El feed de seguimiento no sabe si es un simulador o un
//! dispositivo real que empuja sus lecturas.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::models::location::{ReportedMotion, TelemetrySample};
use crate::utils::errors::{AppError, AppResult};
use crate::utils::geo::GeoPoint;

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Última muestra disponible para el vehículo, si hay alguna
    async fn latest(&self, vehicle_id: Uuid) -> AppResult<Option<TelemetrySample>>;
}

/// Simulador: cada lectura desplaza al vehículo un poco alrededor de un
/// centro fijo, como el mapa de seguimiento del dashboard.
pub struct SimulatedTelemetrySource {
    center: GeoPoint,
    positions: DashMap<Uuid, GeoPoint>,
}

impl SimulatedTelemetrySource {
    /// Centro por defecto: Nueva Delhi
    pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
        latitude: 28.6139,
        longitude: 77.2090,
    };

    pub fn new(center: GeoPoint) -> Self {
        Self {
            center,
            positions: DashMap::new(),
        }
    }
}

impl Default for SimulatedTelemetrySource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CENTER)
    }
}

#[async_trait]
impl TelemetrySource for SimulatedTelemetrySource {
    async fn latest(&self, vehicle_id: Uuid) -> AppResult<Option<TelemetrySample>> {
        let mut rng = rand::thread_rng();

        let mut position = self.positions.entry(vehicle_id).or_insert_with(|| {
            GeoPoint::new(
                self.center.latitude + rng.gen_range(-0.05..0.05),
                self.center.longitude + rng.gen_range(-0.05..0.05),
            )
        });
        position.latitude = (position.latitude + rng.gen_range(-0.005..0.005)).clamp(-90.0, 90.0);
        position.longitude =
            (position.longitude + rng.gen_range(-0.005..0.005)).clamp(-180.0, 180.0);

        let speed_kmh: f64 = if rng.gen_bool(0.8) {
            rng.gen_range(10.0..50.0)
        } else {
            0.0
        };
        let motion = if speed_kmh > 0.0 {
            ReportedMotion::Moving
        } else {
            ReportedMotion::Stopped
        };

        Ok(Some(TelemetrySample {
            vehicle_id,
            position: *position,
            speed_kmh,
            motion,
            timestamp: Utc::now(),
        }))
    }
}

/// Fuente alimentada por dispositivos reales vía `POST /api/tracking/telemetry`.
/// Conserva solo la muestra más reciente de cada vehículo.
#[derive(Default)]
pub struct PushTelemetrySource {
    samples: DashMap<Uuid, TelemetrySample>,
}

impl PushTelemetrySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrar una muestra empujada. Una muestra más antigua que la ya
    /// retenida se rechaza con `StaleTelemetry`.
    pub fn push(&self, sample: TelemetrySample) -> AppResult<()> {
        let mut slot = self.samples.entry(sample.vehicle_id).or_insert_with(|| sample.clone());
        if sample.timestamp < slot.timestamp {
            return Err(AppError::StaleTelemetry(format!(
                "sample at {} is older than held sample at {}",
                sample.timestamp, slot.timestamp
            )));
        }
        debug!(vehicle_id = %sample.vehicle_id, "📡 Muestra de telemetría recibida");
        *slot = sample;
        Ok(())
    }

}

/// Rechazar muestras fechadas más allá de `now + max_skew`
pub fn ensure_not_ahead(
    sample: &TelemetrySample,
    now: DateTime<Utc>,
    max_skew: Duration,
) -> AppResult<()> {
    if sample.timestamp > now + max_skew {
        return Err(AppError::Validation(format!(
            "sample timestamp {} is ahead of server time {}",
            sample.timestamp, now
        )));
    }
    Ok(())
}

#[async_trait]
impl TelemetrySource for PushTelemetrySource {
    async fn latest(&self, vehicle_id: Uuid) -> AppResult<Option<TelemetrySample>> {
        Ok(self.samples.get(&vehicle_id).map(|s| s.clone()))
    }
}
