//! Resumen de la flota para el dashboard principal

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::maintenance::MaintenanceRecord;
use crate::models::vehicle::{DocumentKind, VehicleFilter, VehicleStatus};
use crate::services::maintenance_scheduler::MaintenanceScheduler;
use crate::services::route_graph::RouteGraph;
use crate::services::vehicle_registry::VehicleRegistry;
use crate::utils::errors::AppResult;

const UPCOMING_PREVIEW: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct FleetOverview {
    pub total_vehicles: usize,
    pub active_vehicles: usize,
    pub in_maintenance: usize,
    pub inactive_vehicles: usize,
    pub total_routes: usize,
    pub active_routes: usize,
    /// Estudiantes en paradas de rutas activas
    pub assigned_students: u32,
    pub overdue_maintenance: usize,
    pub expired_insurance: usize,
    pub expired_pollution: usize,
    pub expired_licenses: usize,
    pub upcoming_maintenance: Vec<MaintenanceRecord>,
    pub generated_at: DateTime<Utc>,
}

pub async fn fleet_overview(
    registry: &VehicleRegistry,
    routes: &RouteGraph,
    scheduler: &MaintenanceScheduler,
    now: DateTime<Utc>,
) -> AppResult<FleetOverview> {
    let vehicles = registry.list(&VehicleFilter::default()).await?;
    let all_routes = routes.list().await?;
    let classification = scheduler.classify(now).await?;

    let count_status = |status: VehicleStatus| vehicles.iter().filter(|v| v.status == status).count();
    let today = now.date_naive();
    let count_expired = |kind: DocumentKind| {
        vehicles
            .iter()
            .filter(|v| v.documents.expiry(kind).map_or(false, |d| d <= today))
            .count()
    };

    let active_routes: Vec<_> = all_routes.iter().filter(|r| r.is_active()).collect();

    Ok(FleetOverview {
        total_vehicles: vehicles.len(),
        active_vehicles: count_status(VehicleStatus::Active),
        in_maintenance: count_status(VehicleStatus::Maintenance),
        inactive_vehicles: count_status(VehicleStatus::Inactive),
        total_routes: all_routes.len(),
        active_routes: active_routes.len(),
        assigned_students: active_routes.iter().map(|r| r.total_students()).sum(),
        overdue_maintenance: classification.overdue.len(),
        expired_insurance: count_expired(DocumentKind::Insurance),
        expired_pollution: count_expired(DocumentKind::Pollution),
        expired_licenses: count_expired(DocumentKind::DriverLicense),
        upcoming_maintenance: classification
            .upcoming
            .into_iter()
            .take(UPCOMING_PREVIEW)
            .collect(),
        generated_at: now,
    })
}
