//! Fixtures compartidos por las pruebas unitarias de los servicios

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{AlertConfig, TrackingConfig};
use crate::dto::maintenance_dto::ScheduleMaintenanceRequest;
use crate::dto::route_dto::{CreateRouteRequest, StopRequest};
use crate::dto::vehicle_dto::RegisterVehicleRequest;
use crate::models::alert::Alert;
use crate::models::location::{ReportedMotion, TelemetrySample};
use crate::models::maintenance::MaintenanceKind;
use crate::models::route::{Route, TripKind};
use crate::models::vehicle::{Vehicle, VehicleDocuments};
use crate::repositories::{
    InMemoryAlertRepository, InMemoryMaintenanceRepository, InMemoryRouteRepository,
    InMemoryVehicleRepository,
};
use crate::services::alert_dispatcher::AlertDispatcher;
use crate::services::locks::FleetLocks;
use crate::services::maintenance_scheduler::MaintenanceScheduler;
use crate::services::notification::NotificationSink;
use crate::services::route_graph::RouteGraph;
use crate::services::telemetry::TelemetrySource;
use crate::services::tracking_feed::LiveTrackingFeed;
use crate::services::vehicle_registry::VehicleRegistry;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::geo::GeoPoint;

/// Comportamiento programado por vehículo
#[derive(Clone)]
enum Script {
    Sample(TelemetrySample),
    Fail,
    Hang,
}

/// Fuente de telemetría controlada por la prueba: devuelve exactamente lo
/// que se le indicó, incluso muestras atrasadas.
#[derive(Default)]
pub(crate) struct ScriptedTelemetry {
    scripts: DashMap<Uuid, Script>,
}

impl ScriptedTelemetry {
    pub(crate) fn set(&self, sample: TelemetrySample) {
        self.scripts.insert(sample.vehicle_id, Script::Sample(sample));
    }

    pub(crate) fn clear(&self, vehicle_id: Uuid) {
        self.scripts.remove(&vehicle_id);
    }

    pub(crate) fn fail(&self, vehicle_id: Uuid) {
        self.scripts.insert(vehicle_id, Script::Fail);
    }

    pub(crate) fn hang(&self, vehicle_id: Uuid) {
        self.scripts.insert(vehicle_id, Script::Hang);
    }
}

#[async_trait]
impl TelemetrySource for ScriptedTelemetry {
    async fn latest(&self, vehicle_id: Uuid) -> AppResult<Option<TelemetrySample>> {
        let script = self.scripts.get(&vehicle_id).map(|s| s.clone());
        match script {
            Some(Script::Sample(sample)) => Ok(Some(sample)),
            Some(Script::Fail) => Err(AppError::Telemetry("device unreachable".to_string())),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingSink {
    pub(crate) fn count(&self) -> usize {
        self.alerts.lock().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, alert: &Alert) {
        self.alerts.lock().push(alert.clone());
    }
}

/// Todos los componentes del núcleo cableados sobre repositorios en memoria
pub(crate) struct Fleet {
    pub registry: Arc<VehicleRegistry>,
    pub routes: Arc<RouteGraph>,
    pub scheduler: Arc<MaintenanceScheduler>,
    pub feed: Arc<LiveTrackingFeed>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub telemetry: Arc<ScriptedTelemetry>,
    pub notifications: Arc<RecordingSink>,
}

impl Fleet {
    pub(crate) fn new() -> Self {
        let vehicles = Arc::new(InMemoryVehicleRepository::new());
        let route_repo = Arc::new(InMemoryRouteRepository::new());
        let records = Arc::new(InMemoryMaintenanceRepository::new());
        let locks = FleetLocks::new();

        let registry = Arc::new(VehicleRegistry::new(
            vehicles,
            route_repo.clone(),
            records.clone(),
            locks.clone(),
        ));
        let routes = Arc::new(RouteGraph::new(route_repo, registry.clone(), locks.clone()));
        let scheduler = Arc::new(MaintenanceScheduler::new(records, registry.clone(), locks));

        let telemetry = Arc::new(ScriptedTelemetry::default());
        let tracking = TrackingConfig {
            telemetry_timeout: Duration::from_millis(100),
            ..TrackingConfig::default()
        };
        let feed = Arc::new(LiveTrackingFeed::new(
            registry.clone(),
            routes.clone(),
            telemetry.clone(),
            tracking,
        ));

        let notifications = Arc::new(RecordingSink::default());
        let dispatcher = Arc::new(AlertDispatcher::new(
            Arc::new(InMemoryAlertRepository::new()),
            registry.clone(),
            notifications.clone(),
            AlertConfig::default(),
        ));

        Self {
            registry,
            routes,
            scheduler,
            feed,
            dispatcher,
            telemetry,
            notifications,
        }
    }

    pub(crate) async fn vehicle(&self, registration: &str, capacity: i64) -> Vehicle {
        self.registry
            .register(RegisterVehicleRequest {
                registration_number: registration.to_string(),
                capacity,
                driver_name: "Suresh Yadav".to_string(),
                driver_phone: "9876543210".to_string(),
                model: Some("Tata Starbus".to_string()),
                manufacture_year: Some(2019),
                fuel_efficiency: Some(6.5),
                documents: VehicleDocuments::default(),
            })
            .await
            .unwrap()
    }

    pub(crate) async fn route(&self, name: &str, stops: Vec<StopRequest>) -> Route {
        self.routes
            .create_route(CreateRouteRequest {
                name: name.to_string(),
                stops,
                start_time: None,
                end_time: None,
                vehicle_id: None,
                trip_kind: TripKind::Pickup,
                distance_km: None,
                estimated_duration_minutes: None,
            })
            .await
            .unwrap()
    }
}

pub(crate) fn stop(name: &str, time: Option<(u32, u32)>, students: u32) -> StopRequest {
    StopRequest {
        name: name.to_string(),
        latitude: 28.6,
        longitude: 77.2,
        scheduled_time: time.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
        student_count: students,
    }
}

pub(crate) fn maintenance(
    performed_at: DateTime<Utc>,
    next_due_at: DateTime<Utc>,
    cost: i64,
) -> ScheduleMaintenanceRequest {
    ScheduleMaintenanceRequest {
        kind: MaintenanceKind::Regular,
        description: "Oil change".to_string(),
        cost: Decimal::from(cost),
        performed_at,
        next_due_at,
    }
}

pub(crate) fn sample(
    vehicle_id: Uuid,
    timestamp: DateTime<Utc>,
    speed_kmh: f64,
    motion: ReportedMotion,
) -> TelemetrySample {
    TelemetrySample {
        vehicle_id,
        position: GeoPoint::new(28.61, 77.21),
        speed_kmh,
        motion,
        timestamp,
    }
}
