//! Grafo de rutas
//!
//! Dueño de las rutas, su secuencia ordenada de paradas y la asignación
//! vehículo → ruta. Garantiza que el total de estudiantes de una ruta nunca
//! supere la capacidad del vehículo asignado.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::dto::route_dto::{CreateRouteRequest, StopRequest};
use crate::models::route::{Route, RouteStatus, Stop};
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::repositories::RouteRepository;
use crate::services::locks::FleetLocks;
use crate::services::vehicle_registry::VehicleRegistry;
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};
use crate::utils::geo::GeoPoint;
use crate::utils::validation::validate_time_window;

pub struct RouteGraph {
    routes: Arc<dyn RouteRepository>,
    registry: Arc<VehicleRegistry>,
    locks: Arc<FleetLocks>,
}

fn build_stop(request: StopRequest) -> AppResult<Stop> {
    request.validate()?;
    Ok(Stop {
        name: request.name.trim().to_string(),
        location: GeoPoint::new(request.latitude, request.longitude),
        scheduled_time: request.scheduled_time,
        student_count: request.student_count,
    })
}

fn ensure_capacity(total_students: u32, vehicle: &Vehicle) -> AppResult<()> {
    if total_students > vehicle.capacity {
        return Err(AppError::CapacityExceeded {
            required: total_students,
            capacity: vehicle.capacity,
        });
    }
    Ok(())
}

fn ensure_available(vehicle: &Vehicle) -> AppResult<()> {
    if vehicle.status != VehicleStatus::Active {
        return Err(AppError::VehicleUnavailable(format!(
            "vehicle {} is {}",
            vehicle.registration_number, vehicle.status
        )));
    }
    Ok(())
}

impl RouteGraph {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        registry: Arc<VehicleRegistry>,
        locks: Arc<FleetLocks>,
    ) -> Self {
        Self {
            routes,
            registry,
            locks,
        }
    }

    pub async fn create_route(&self, request: CreateRouteRequest) -> AppResult<Route> {
        request.validate()?;
        validate_time_window(request.start_time, request.end_time)
            .map_err(|_| validation_error("end_time", "must be after start_time"))?;

        let stops = request
            .stops
            .into_iter()
            .map(build_stop)
            .collect::<AppResult<Vec<Stop>>>()?;

        let now = Utc::now();
        let mut route = Route {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            stops,
            start_time: request.start_time,
            end_time: request.end_time,
            vehicle_id: None,
            status: RouteStatus::Active,
            trip_kind: request.trip_kind,
            distance_km: request.distance_km,
            estimated_duration_minutes: request.estimated_duration_minutes,
            created_at: now,
            updated_at: now,
        };

        let route = match request.vehicle_id {
            Some(vehicle_id) => {
                let _vehicle_guard = self.locks.vehicles.acquire(vehicle_id).await;
                let vehicle = self.registry.get(vehicle_id).await?;
                ensure_available(&vehicle)?;
                ensure_capacity(route.total_students(), &vehicle)?;
                route.vehicle_id = Some(vehicle_id);
                self.routes.insert(route).await?
            }
            None => self.routes.insert(route).await?,
        };

        info!(route_id = %route.id, name = %route.name, stops = route.stops.len(), "🗺️ Ruta creada");
        Ok(route)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Route> {
        self.routes
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Route", &id.to_string()))
    }

    pub async fn list(&self) -> AppResult<Vec<Route>> {
        self.routes.list().await
    }

    /// Rutas asignadas a un vehículo (activas e inactivas)
    pub async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Route>> {
        self.routes.list_by_vehicle(vehicle_id).await
    }

    pub async fn assign_vehicle(&self, route_id: Uuid, vehicle_id: Uuid) -> AppResult<Route> {
        let _route_guard = self.locks.routes.acquire(route_id).await;
        let _vehicle_guard = self.locks.vehicles.acquire(vehicle_id).await;

        let mut route = self.get(route_id).await?;
        let vehicle = self.registry.get(vehicle_id).await?;

        ensure_available(&vehicle)?;
        ensure_capacity(route.total_students(), &vehicle)?;

        route.vehicle_id = Some(vehicle_id);
        route.updated_at = Utc::now();
        let route = self.routes.update(route).await?;

        info!(route_id = %route_id, vehicle_id = %vehicle_id, "🚌 Vehículo asignado a ruta");
        Ok(route)
    }

    pub async fn unassign_vehicle(&self, route_id: Uuid) -> AppResult<Route> {
        let _route_guard = self.locks.routes.acquire(route_id).await;

        let mut route = self.get(route_id).await?;
        if route.vehicle_id.take().is_some() {
            route.updated_at = Utc::now();
            route = self.routes.update(route).await?;
            info!(route_id = %route_id, "Vehículo desasignado de ruta");
        }
        Ok(route)
    }

    /// Insertar una parada en `index` (al final si es `None`)
    pub async fn add_stop(
        &self,
        route_id: Uuid,
        index: Option<usize>,
        request: StopRequest,
    ) -> AppResult<Route> {
        let stop = build_stop(request)?;
        self.mutate_stops(route_id, move |stops| {
            let at = index.unwrap_or(stops.len());
            if at > stops.len() {
                return Err(validation_error("index", "stop index out of range"));
            }
            stops.insert(at, stop);
            Ok(())
        })
        .await
    }

    pub async fn remove_stop(&self, route_id: Uuid, index: usize) -> AppResult<Route> {
        self.mutate_stops(route_id, move |stops| {
            if index >= stops.len() {
                return Err(validation_error("index", "stop index out of range"));
            }
            stops.remove(index);
            Ok(())
        })
        .await
    }

    /// Conteo de estudiantes por parada, provisto por el módulo académico
    pub async fn set_student_count(
        &self,
        route_id: Uuid,
        index: usize,
        student_count: u32,
    ) -> AppResult<Route> {
        self.mutate_stops(route_id, move |stops| {
            let stop = stops
                .get_mut(index)
                .ok_or_else(|| validation_error("index", "stop index out of range"))?;
            stop.student_count = student_count;
            Ok(())
        })
        .await
    }

    pub async fn rename(&self, route_id: Uuid, name: &str) -> AppResult<Route> {
        let name = name.trim();
        if name.is_empty() {
            return Err(validation_error("name", "must not be blank"));
        }
        let _route_guard = self.locks.routes.acquire(route_id).await;

        let mut route = self.get(route_id).await?;
        route.name = name.to_string();
        route.updated_at = Utc::now();
        self.routes.update(route).await
    }

    /// Reactivar una ruta con vehículo vuelve a exigir que el vehículo
    /// esté disponible y tenga capacidad suficiente.
    pub async fn set_status(&self, route_id: Uuid, status: RouteStatus) -> AppResult<Route> {
        let _route_guard = self.locks.routes.acquire(route_id).await;

        let mut route = self.get(route_id).await?;
        let _vehicle_guard = match route.vehicle_id {
            Some(vehicle_id) if status == RouteStatus::Active && !route.is_active() => {
                let guard = self.locks.vehicles.acquire(vehicle_id).await;
                let vehicle = self.registry.get(vehicle_id).await?;
                ensure_available(&vehicle)?;
                ensure_capacity(route.total_students(), &vehicle)?;
                Some(guard)
            }
            _ => None,
        };

        if route.status != status {
            route.status = status;
            route.updated_at = Utc::now();
            route = self.routes.update(route).await?;
        }
        Ok(route)
    }

    pub async fn delete_route(&self, route_id: Uuid) -> AppResult<()> {
        let _route_guard = self.locks.routes.acquire(route_id).await;
        self.routes.delete(route_id).await?;
        self.locks.routes.forget(route_id);
        info!(route_id = %route_id, "🗑️ Ruta eliminada");
        Ok(())
    }

    /// Aplica un cambio sobre las paradas y vuelve a validar la capacidad
    /// del vehículo asignado antes de guardar.
    async fn mutate_stops<F>(&self, route_id: Uuid, change: F) -> AppResult<Route>
    where
        F: FnOnce(&mut Vec<Stop>) -> AppResult<()>,
    {
        let _route_guard = self.locks.routes.acquire(route_id).await;

        let mut route = self.get(route_id).await?;
        change(&mut route.stops)?;

        let _vehicle_guard = match route.vehicle_id {
            Some(vehicle_id) => {
                let guard = self.locks.vehicles.acquire(vehicle_id).await;
                let vehicle = self.registry.get(vehicle_id).await?;
                ensure_capacity(route.total_students(), &vehicle)?;
                Some(guard)
            }
            None => None,
        };

        route.updated_at = Utc::now();
        let route = self.routes.update(route).await?;
        debug!(route_id = %route_id, stops = route.stops.len(), "Paradas actualizadas");
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stop, Fleet};

    #[tokio::test]
    async fn test_capacity_exceeded_scenario() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-01-0040", 40).await;
        let route = fleet
            .route("East", vec![stop("A", Some((7, 0)), 25), stop("B", Some((7, 20)), 20)])
            .await;

        let err = fleet.routes.assign_vehicle(route.id, vehicle.id).await.unwrap_err();
        assert_eq!(err, AppError::CapacityExceeded { required: 45, capacity: 40 });
        assert_eq!(fleet.routes.get(route.id).await.unwrap().vehicle_id, None);
    }

    #[tokio::test]
    async fn test_assign_requires_active_vehicle() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-01-0041", 40).await;
        let route = fleet.route("West", vec![stop("A", None, 10)]).await;

        fleet
            .registry
            .update_status(vehicle.id, VehicleStatus::Maintenance)
            .await
            .unwrap();
        let err = fleet.routes.assign_vehicle(route.id, vehicle.id).await.unwrap_err();
        assert!(matches!(err, AppError::VehicleUnavailable(_)));

        // Vuelta a active restaura la elegibilidad
        fleet.registry.update_status(vehicle.id, VehicleStatus::Active).await.unwrap();
        let route = fleet.routes.assign_vehicle(route.id, vehicle.id).await.unwrap();
        assert_eq!(route.vehicle_id, Some(vehicle.id));
        assert_eq!(fleet.routes.list_by_vehicle(vehicle.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_ordering_and_capacity_recheck() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-01-0042", 30).await;
        let route = fleet.route("South", vec![stop("A", None, 10), stop("C", None, 10)]).await;
        fleet.routes.assign_vehicle(route.id, vehicle.id).await.unwrap();

        let b = StopRequest {
            name: "B".to_string(),
            latitude: 28.6,
            longitude: 77.2,
            scheduled_time: None,
            student_count: 5,
        };
        let route = fleet.routes.add_stop(route.id, Some(1), b.clone()).await.unwrap();
        let names: Vec<&str> = route.stops.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let err = fleet
            .routes
            .add_stop(route.id, None, StopRequest { student_count: 6, ..b.clone() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded { required: 31, capacity: 30 }));

        let err = fleet.routes.add_stop(route.id, Some(9), b).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let route = fleet.routes.remove_stop(route.id, 0).await.unwrap();
        assert_eq!(route.stops[0].name, "B");
        assert!(route.total_students() <= vehicle.capacity);

        let err = fleet.routes.set_student_count(route.id, 0, 40).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn test_maintenance_and_assignment_are_exclusive() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-01-0043", 40).await;
        let route = fleet.route("Race", vec![stop("A", None, 10)]).await;

        let registry = fleet.registry.clone();
        let routes = fleet.routes.clone();
        let (status, assign) = tokio::join!(
            registry.update_status(vehicle.id, VehicleStatus::Maintenance),
            routes.assign_vehicle(route.id, vehicle.id),
        );

        // Se serializan sobre el lock del vehículo: gana exactamente una
        assert_ne!(status.is_ok(), assign.is_ok());
        let final_route = fleet.routes.get(route.id).await.unwrap();
        let final_status = fleet.registry.get(vehicle.id).await.unwrap().status;
        if assign.is_ok() {
            assert!(matches!(status, Err(AppError::Conflict(_))));
            assert_eq!(final_route.vehicle_id, Some(vehicle.id));
            assert_eq!(final_status, VehicleStatus::Active);
        } else {
            assert!(matches!(assign, Err(AppError::VehicleUnavailable(_))));
            assert_eq!(final_route.vehicle_id, None);
            assert_eq!(final_status, VehicleStatus::Maintenance);
        }
    }

    #[tokio::test]
    async fn test_assigned_vehicle_cannot_leave_active_service() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-01-0044", 40).await;
        let route = fleet.route("Ring", vec![stop("A", None, 10)]).await;
        fleet.routes.assign_vehicle(route.id, vehicle.id).await.unwrap();

        for target in [VehicleStatus::Maintenance, VehicleStatus::Inactive] {
            let err = fleet.registry.update_status(vehicle.id, target).await.unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);
        }
        assert_eq!(fleet.registry.get(vehicle.id).await.unwrap().status, VehicleStatus::Active);

        // Con la ruta inactiva el taller vuelve a estar permitido
        fleet.routes.set_status(route.id, RouteStatus::Inactive).await.unwrap();
        fleet
            .registry
            .update_status(vehicle.id, VehicleStatus::Maintenance)
            .await
            .unwrap();

        // y la ruta no se reactiva mientras el vehículo esté en taller
        let err = fleet.routes.set_status(route.id, RouteStatus::Active).await.unwrap_err();
        assert!(matches!(err, AppError::VehicleUnavailable(_)));
        assert!(!fleet.routes.get(route.id).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_removed_vehicle_is_released_from_inactive_routes() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-01-0045", 40).await;
        let route = fleet.route("Loop", vec![stop("A", None, 10)]).await;
        fleet.routes.assign_vehicle(route.id, vehicle.id).await.unwrap();

        // Con la ruta activa la baja se rechaza
        let err = fleet.registry.remove(vehicle.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        fleet.routes.set_status(route.id, RouteStatus::Inactive).await.unwrap();
        fleet.registry.remove(vehicle.id).await.unwrap();

        let route = fleet.routes.set_status(route.id, RouteStatus::Active).await.unwrap();
        assert_eq!(route.vehicle_id, None);
        assert!(fleet.routes.list_by_vehicle(vehicle.id).await.unwrap().is_empty());
        let route = fleet.routes.set_student_count(route.id, 0, 55).await.unwrap();
        assert_eq!(route.total_students(), 55);
    }

    #[tokio::test]
    async fn test_inactive_route_still_checks_capacity() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-01-0046", 20).await;
        let route = fleet.route("Hill", vec![stop("A", None, 10)]).await;
        fleet.routes.assign_vehicle(route.id, vehicle.id).await.unwrap();
        fleet.routes.set_status(route.id, RouteStatus::Inactive).await.unwrap();

        // Las paradas se siguen validando contra el vehículo asignado
        let err = fleet.routes.set_student_count(route.id, 0, 25).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded { .. }));
        let route = fleet.routes.set_status(route.id, RouteStatus::Active).await.unwrap();
        assert!(route.is_active());
    }
}
