//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum: una instancia de cada componente del
//! núcleo, cableadas sobre repositorios en memoria.

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::environment::{EnvironmentConfig, TelemetryMode};
use crate::repositories::{
    InMemoryAlertRepository, InMemoryMaintenanceRepository, InMemoryRouteRepository,
    InMemoryVehicleRepository,
};
use crate::services::{
    AlertDispatcher, FleetLocks, LiveTrackingFeed, LogNotificationSink, MaintenanceScheduler,
    PushTelemetrySource, RouteGraph, SimulatedTelemetrySource, TelemetrySource, VehicleRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub registry: Arc<VehicleRegistry>,
    pub routes: Arc<RouteGraph>,
    pub scheduler: Arc<MaintenanceScheduler>,
    pub feed: Arc<LiveTrackingFeed>,
    pub dispatcher: Arc<AlertDispatcher>,
    /// Presente solo en modo `push`
    pub push_telemetry: Option<Arc<PushTelemetrySource>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(config: EnvironmentConfig) -> Self {
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

        let push_telemetry = match config.telemetry_mode {
            TelemetryMode::Push => Some(Arc::new(PushTelemetrySource::new())),
            TelemetryMode::Simulated => None,
        };
        let source: Arc<dyn TelemetrySource> = match &push_telemetry {
            Some(push) => push.clone(),
            None => Arc::new(SimulatedTelemetrySource::default()),
        };
        let feed = Arc::new(LiveTrackingFeed::new(
            registry.clone(),
            routes.clone(),
            source,
            config.tracking(),
        ));

        let dispatcher = Arc::new(AlertDispatcher::new(
            Arc::new(InMemoryAlertRepository::new()),
            registry.clone(),
            Arc::new(LogNotificationSink),
            config.alerts(),
        ));

        Self {
            config,
            registry,
            routes,
            scheduler,
            feed,
            dispatcher,
            push_telemetry,
            shutdown: Arc::new(watch::channel(false).0),
        }
    }

    /// Receptor de la señal de apagado (loops en segundo plano y streams SSE)
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
