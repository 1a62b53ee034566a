//! Repositorios
//!
//! Cada componente es dueño de su almacenamiento a través de un trait;
//! las implementaciones en memoria son las que usa el binario.

pub mod alert_repository;
pub mod maintenance_repository;
pub mod route_repository;
pub mod vehicle_repository;

pub use alert_repository::{AlertRepository, InMemoryAlertRepository};
pub use maintenance_repository::{InMemoryMaintenanceRepository, MaintenanceRepository};
pub use route_repository::{InMemoryRouteRepository, RouteRepository};
pub use vehicle_repository::{InMemoryVehicleRepository, VehicleRepository};
