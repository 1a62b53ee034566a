//! Feed de seguimiento en vivo
//!
//! Un tick recorre todos los vehículos activos, trae la última muestra de
//! telemetría de cada uno y actualiza su `VehicleLocation`. Cada vehículo
//! tiene un único escritor (su slot con mutex propio); los lectores solo
//! ven snapshots inmutables publicados al final de cada tick.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TrackingConfig;
use crate::models::location::{
    Anomaly, MovementStatus, ReportedMotion, TelemetrySample, TickReport, VehicleLocation,
};
use crate::models::vehicle::{VehicleFilter, VehicleStatus};
use crate::services::route_graph::RouteGraph;
use crate::services::telemetry::{ensure_not_ahead, TelemetrySource};
use crate::services::vehicle_registry::VehicleRegistry;
use crate::utils::errors::{AppError, AppResult};

type Snapshot = Arc<Vec<VehicleLocation>>;
type Slot = Arc<Mutex<Option<VehicleLocation>>>;

pub struct LiveTrackingFeed {
    registry: Arc<VehicleRegistry>,
    ctx: TickContext,
    slots: DashMap<Uuid, Slot>,
    snapshot: Arc<RwLock<Snapshot>>,
    updates: broadcast::Sender<Snapshot>,
    tick_lock: Mutex<()>,
}

/// Lo que necesita la tarea de un vehículo; se clona en cada tarea
#[derive(Clone)]
struct TickContext {
    routes: Arc<RouteGraph>,
    source: Arc<dyn TelemetrySource>,
    config: Arc<TrackingConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleOutcome {
    NoSample,
    Accepted,
    Duplicate,
    RejectedStale,
}

struct VehicleUpdate {
    outcome: SampleOutcome,
    went_offline: bool,
    anomaly: Option<Anomaly>,
    errors: Vec<String>,
    location: Option<VehicleLocation>,
}

impl VehicleUpdate {
    fn changed(&self) -> bool {
        self.outcome == SampleOutcome::Accepted || self.went_offline
    }
}

impl LiveTrackingFeed {
    pub fn new(
        registry: Arc<VehicleRegistry>,
        routes: Arc<RouteGraph>,
        source: Arc<dyn TelemetrySource>,
        config: TrackingConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(config.snapshot_channel_capacity.max(1));
        Self {
            registry,
            ctx: TickContext {
                routes,
                source,
                config: Arc::new(config),
            },
            slots: DashMap::new(),
            snapshot: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            updates,
            tick_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.ctx.config
    }

    pub async fn tick(&self) -> AppResult<TickReport> {
        self.tick_at(Utc::now()).await
    }

    /// Ejecutar un tick con `now` como reloj de referencia. Los ticks nunca
    /// se solapan; un error de un vehículo no afecta a los demás.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        let _tick = self.tick_lock.lock().await;

        let vehicles = self
            .registry
            .list(&VehicleFilter::with_status(VehicleStatus::Active))
            .await?;

        let handles: Vec<_> = vehicles
            .iter()
            .map(|vehicle| {
                let slot = self.slots.entry(vehicle.id).or_default().clone();
                let ctx = self.ctx.clone();
                let vehicle_id = vehicle.id;
                (
                    vehicle_id,
                    tokio::spawn(async move { update_vehicle(ctx, vehicle_id, slot, now).await }),
                )
            })
            .collect();

        let mut report = TickReport {
            at: Some(now),
            processed: handles.len(),
            ..Default::default()
        };
        let mut changed = Vec::new();

        // Se esperan todas las tareas: ningún slot queda a medio escribir
        for (vehicle_id, handle) in handles {
            let update = match handle.await {
                Ok(update) => update,
                Err(err) => {
                    let err = AppError::Internal(format!("tracking task failed: {}", err));
                    warn!(vehicle_id = %vehicle_id, error = %err, "Tarea de seguimiento abortada");
                    report.errors.push((vehicle_id, err.to_string()));
                    continue;
                }
            };

            match update.outcome {
                SampleOutcome::Accepted => report.accepted.push(vehicle_id),
                SampleOutcome::Duplicate => report.duplicates.push(vehicle_id),
                SampleOutcome::RejectedStale => report.rejected_stale.push(vehicle_id),
                SampleOutcome::NoSample => {}
            }
            if update.went_offline {
                report.went_offline.push(vehicle_id);
            }
            for error in &update.errors {
                report.errors.push((vehicle_id, error.clone()));
            }
            if update.changed() {
                if let Some(location) = &update.location {
                    changed.push(location.clone());
                }
            }
            if let Some(anomaly) = update.anomaly {
                report.anomalies.push(anomaly);
            }
            if let Some(location) = update.location {
                report.locations.push(location);
            }
        }

        *self.snapshot.write() = Arc::new(report.locations.clone());
        if !changed.is_empty() {
            // Sin suscriptores el envío falla; no es un error
            let _ = self.updates.send(Arc::new(changed));
        }

        debug!(
            processed = report.processed,
            accepted = report.accepted.len(),
            offline = report.went_offline.len(),
            errors = report.errors.len(),
            "⏱️ Tick de seguimiento"
        );
        Ok(report)
    }

    /// Último snapshot publicado
    pub fn locations(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    pub fn location(&self, vehicle_id: Uuid) -> Option<VehicleLocation> {
        self.snapshot
            .read()
            .iter()
            .find(|l| l.vehicle_id == vehicle_id)
            .cloned()
    }

    /// Suscribirse a las actualizaciones. La primera entrega es el
    /// snapshot actual; luego, los registros cambiados en cada tick.
    pub fn subscribe(&self) -> LocationSubscription {
        LocationSubscription {
            pending: Some(self.locations()),
            snapshot: self.snapshot.clone(),
            receiver: self.updates.subscribe(),
            seen: HashMap::new(),
        }
    }
}

async fn update_vehicle(
    ctx: TickContext,
    vehicle_id: Uuid,
    slot: Slot,
    now: DateTime<Utc>,
) -> VehicleUpdate {
    let mut update = VehicleUpdate {
        outcome: SampleOutcome::NoSample,
        went_offline: false,
        anomaly: None,
        errors: Vec::new(),
        location: None,
    };

    let pulled = match timeout(ctx.config.telemetry_timeout, ctx.source.latest(vehicle_id)).await {
        Ok(Ok(Some(sample))) if sample.vehicle_id != vehicle_id => {
            update.errors.push(
                AppError::Telemetry(format!("sample for {} returned for {}", sample.vehicle_id, vehicle_id))
                    .to_string(),
            );
            None
        }
        Ok(Ok(Some(sample))) => match ensure_not_ahead(&sample, now, ctx.config.max_clock_skew) {
            Ok(()) => Some(sample),
            Err(err) => {
                warn!(vehicle_id = %vehicle_id, error = %err, "Muestra con reloj adelantado");
                update.errors.push(err.to_string());
                None
            }
        },
        Ok(Ok(None)) => None,
        Ok(Err(err)) => {
            warn!(vehicle_id = %vehicle_id, error = %err, "Error de telemetría");
            update.errors.push(err.to_string());
            None
        }
        Err(_) => {
            let err = AppError::Telemetry(format!(
                "telemetry pull timed out after {} ms",
                ctx.config.telemetry_timeout.as_millis()
            ));
            warn!(vehicle_id = %vehicle_id, error = %err, "Timeout de telemetría");
            update.errors.push(err.to_string());
            None
        }
    };

    let mut current = slot.lock().await;

    if let Some(sample) = pulled {
        match current.as_ref().map(|loc| sample.timestamp.cmp(&loc.timestamp)) {
            Some(Ordering::Less) => {
                let err = AppError::StaleTelemetry(format!(
                    "sample at {} is older than stored sample",
                    sample.timestamp
                ));
                warn!(vehicle_id = %vehicle_id, error = %err, "Muestra rechazada");
                update.outcome = SampleOutcome::RejectedStale;
            }
            Some(Ordering::Equal) => update.outcome = SampleOutcome::Duplicate,
            _ => {
                let (location, anomaly) = ctx.resolve(sample, now, &mut update.errors).await;
                *current = Some(location);
                update.anomaly = anomaly;
                update.outcome = SampleOutcome::Accepted;
            }
        }
    }

    if update.outcome != SampleOutcome::Accepted {
        if let Some(location) = current.as_mut() {
            let silent_for = now - location.accepted_at;
            if location.status != MovementStatus::Offline
                && silent_for > ctx.config.staleness_window
            {
                location.status = MovementStatus::Offline;
                location.offline_since = Some(now);
                location.eta = None;
                update.went_offline = true;
                info!(vehicle_id = %vehicle_id, silent_secs = silent_for.num_seconds(), "📴 Vehículo sin señal, marcado offline");
            }
        }
    }

    update.location = current.clone();
    update
}

impl TickContext {
    /// Construir la nueva ubicación a partir de una muestra aceptada:
    /// próxima parada, ETA y detección de lecturas anómalas.
    async fn resolve(
        &self,
        sample: TelemetrySample,
        now: DateTime<Utc>,
        errors: &mut Vec<String>,
    ) -> (VehicleLocation, Option<Anomaly>) {
        let config = &self.config;
        let speed = sample.speed_kmh.max(0.0);

        let anomaly = match sample.motion {
            ReportedMotion::Moving if speed <= config.min_speed_kmh => Some(format!(
                "reported moving at {:.1} km/h",
                speed
            )),
            ReportedMotion::Stopped if speed > config.stopped_speed_kmh => Some(format!(
                "reported stopped at {:.1} km/h",
                speed
            )),
            _ => None,
        }
        .map(|description| {
            let err = AppError::AnomalousReading(description.clone());
            debug!(vehicle_id = %sample.vehicle_id, error = %err, "Lectura anómala");
            Anomaly {
                vehicle_id: sample.vehicle_id,
                description,
                observed_at: sample.timestamp,
            }
        });

        let routes = match self.routes.list_by_vehicle(sample.vehicle_id).await {
            Ok(routes) => routes,
            Err(err) => {
                errors.push(err.to_string());
                Vec::new()
            }
        };
        let local_time = sample
            .timestamp
            .with_timezone(&config.school_offset)
            .time();
        let next_stop = routes
            .iter()
            .filter(|r| r.is_active())
            .find_map(|r| r.next_stop(local_time));

        let (next_stop_name, eta) = match next_stop {
            Some(stop) => {
                let distance_km = sample.position.distance_km(&stop.location);
                let travel = if speed > config.min_speed_kmh {
                    Duration::milliseconds((distance_km / speed * 3_600_000.0).round() as i64)
                } else {
                    config.default_eta
                };
                (Some(stop.name.clone()), Some(sample.timestamp + travel))
            }
            None => (None, None),
        };

        let location = VehicleLocation {
            vehicle_id: sample.vehicle_id,
            position: sample.position,
            speed_kmh: speed,
            status: sample.motion.into(),
            timestamp: sample.timestamp,
            accepted_at: now,
            next_stop: next_stop_name,
            eta,
            offline_since: None,
        };
        (location, anomaly)
    }
}

/// Stream de actualizaciones para un dashboard. Descarta entregas
/// repetidas o atrasadas comparando `(timestamp, status)` por vehículo.
pub struct LocationSubscription {
    pending: Option<Snapshot>,
    snapshot: Arc<RwLock<Snapshot>>,
    receiver: broadcast::Receiver<Snapshot>,
    seen: HashMap<Uuid, (DateTime<Utc>, MovementStatus)>,
}

impl LocationSubscription {
    /// Próximo lote de ubicaciones nuevas; `None` cuando el feed se cerró
    pub async fn recv(&mut self) -> Option<Vec<VehicleLocation>> {
        loop {
            let batch = match self.pending.take() {
                Some(batch) => batch,
                None => match self.receiver.recv().await {
                    Ok(batch) => batch,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Se resincroniza con el snapshot completo
                        debug!(skipped, "Suscriptor atrasado, resincronizando");
                        self.pending = Some(self.snapshot.read().clone());
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            };

            let fresh: Vec<VehicleLocation> = batch
                .iter()
                .filter(|location| self.is_new(location))
                .cloned()
                .collect();
            for location in &fresh {
                self.seen
                    .insert(location.vehicle_id, (location.timestamp, location.status));
            }
            if !fresh.is_empty() {
                return Some(fresh);
            }
        }
    }

    fn is_new(&self, location: &VehicleLocation) -> bool {
        match self.seen.get(&location.vehicle_id) {
            Some((timestamp, _)) if location.timestamp < *timestamp => false,
            Some((timestamp, status)) => {
                location.timestamp > *timestamp || location.status != *status
            }
            None => true,
        }
    }
}
