//! Services module
//!
//! Este módulo contiene la lógica de negocio: los cinco componentes del
//! núcleo de la flota, sus colaboradores y las tareas en segundo plano.

pub mod alert_dispatcher;
pub mod background;
pub mod locks;
pub mod maintenance_scheduler;
pub mod notification;
pub mod overview;
pub mod route_graph;
pub mod telemetry;
pub mod tracking_feed;
pub mod vehicle_registry;

pub use alert_dispatcher::AlertDispatcher;
pub use locks::{EntityLocks, FleetLocks};
pub use maintenance_scheduler::MaintenanceScheduler;
pub use notification::{LogNotificationSink, NotificationSink};
pub use route_graph::RouteGraph;
pub use telemetry::{PushTelemetrySource, SimulatedTelemetrySource, TelemetrySource};
pub use tracking_feed::{LiveTrackingFeed, LocationSubscription};
pub use vehicle_registry::VehicleRegistry;
