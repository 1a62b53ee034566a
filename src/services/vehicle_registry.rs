//! Registro de vehículos
//!
//! Dueño de la identidad, capacidad, documentos y ciclo de vida de cada
//! vehículo. Rutas y mantenimiento solo lo referencian.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::vehicle_dto::{RegisterVehicleRequest, UpdateVehicleRequest};
use crate::models::vehicle::{NextMaintenance, Vehicle, VehicleFilter, VehicleStatus};
use crate::repositories::{MaintenanceRepository, RouteRepository, VehicleRepository};
use crate::services::locks::FleetLocks;
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};

pub struct VehicleRegistry {
    vehicles: Arc<dyn VehicleRepository>,
    routes: Arc<dyn RouteRepository>,
    maintenance: Arc<dyn MaintenanceRepository>,
    locks: Arc<FleetLocks>,
}

impl VehicleRegistry {
    pub fn new(
        vehicles: Arc<dyn VehicleRepository>,
        routes: Arc<dyn RouteRepository>,
        maintenance: Arc<dyn MaintenanceRepository>,
        locks: Arc<FleetLocks>,
    ) -> Self {
        Self {
            vehicles,
            routes,
            maintenance,
            locks,
        }
    }

    pub async fn register(&self, request: RegisterVehicleRequest) -> AppResult<Vehicle> {
        request.validate()?;

        let capacity = u32::try_from(request.capacity)
            .map_err(|_| validation_error("capacity", "must be a positive integer"))?;

        let registration_number = request.registration_number.trim().to_string();
        let now = Utc::now();
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            registration_number,
            capacity,
            driver_name: request.driver_name.trim().to_string(),
            driver_phone: request.driver_phone.trim().to_string(),
            status: VehicleStatus::Active,
            model: request.model,
            manufacture_year: request.manufacture_year,
            fuel_efficiency: request.fuel_efficiency,
            documents: request.documents,
            maintenance_history: Vec::new(),
            next_maintenance: None,
            created_at: now,
            updated_at: now,
        };

        // La unicidad de la matrícula la garantiza el repositorio
        let vehicle = self.vehicles.insert(vehicle).await?;
        info!(vehicle_id = %vehicle.id, registration = %vehicle.registration_number, "🚌 Vehículo registrado");
        Ok(vehicle)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Vehicle> {
        self.vehicles
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))
    }

    pub async fn list(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        Ok(self
            .vehicles
            .list()
            .await?
            .into_iter()
            .filter(|v| filter.matches(v))
            .collect())
    }

    pub async fn update_status(&self, id: Uuid, new_status: VehicleStatus) -> AppResult<Vehicle> {
        let _guard = self.locks.vehicles.acquire(id).await;

        let mut vehicle = self.get(id).await?;
        if vehicle.status == new_status {
            return Ok(vehicle);
        }

        if !vehicle.status.can_transition_to(new_status) {
            warn!(vehicle_id = %id, from = %vehicle.status, to = %new_status, "Transición de estado rechazada");
            return Err(AppError::InvalidStateTransition {
                from: vehicle.status,
                to: new_status,
            });
        }

        // Un vehículo con ruta activa solo puede seguir activo
        if new_status != VehicleStatus::Active {
            let active_routes = self.active_route_names(id).await?;
            if !active_routes.is_empty() {
                warn!(vehicle_id = %id, to = %new_status, "Vehículo con rutas activas");
                return Err(AppError::Conflict(format!(
                    "vehicle {} is assigned to active route(s): {}",
                    id,
                    active_routes.join(", ")
                )));
            }
        }

        let previous = vehicle.status;
        vehicle.status = new_status;
        vehicle.updated_at = Utc::now();
        let vehicle = self.vehicles.update(vehicle).await?;

        info!(vehicle_id = %id, from = %previous, to = %new_status, "🔄 Estado de vehículo actualizado");
        Ok(vehicle)
    }

    /// Actualizar conductor, datos descriptivos y vencimientos de documentos
    pub async fn update_details(&self, id: Uuid, request: UpdateVehicleRequest) -> AppResult<Vehicle> {
        request.validate()?;
        let _guard = self.locks.vehicles.acquire(id).await;

        let mut vehicle = self.get(id).await?;
        if let Some(name) = request.driver_name {
            vehicle.driver_name = name.trim().to_string();
        }
        if let Some(phone) = request.driver_phone {
            vehicle.driver_phone = phone.trim().to_string();
        }
        if request.model.is_some() {
            vehicle.model = request.model;
        }
        if request.manufacture_year.is_some() {
            vehicle.manufacture_year = request.manufacture_year;
        }
        if request.fuel_efficiency.is_some() {
            vehicle.fuel_efficiency = request.fuel_efficiency;
        }
        if request.insurance_expiry.is_some() {
            vehicle.documents.insurance_expiry = request.insurance_expiry;
        }
        if request.pollution_expiry.is_some() {
            vehicle.documents.pollution_expiry = request.pollution_expiry;
        }
        if request.license_expiry.is_some() {
            vehicle.documents.license_expiry = request.license_expiry;
        }
        vehicle.updated_at = Utc::now();

        self.vehicles.update(vehicle).await
    }

    /// Eliminar un vehículo sin rutas activas ni mantenimiento programado.
    /// Las rutas inactivas que lo referencian quedan sin vehículo.
    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        loop {
            // Locks de ruta en orden de id, luego el del vehículo
            let route_ids = self.assigned_route_ids(id).await?;
            let mut route_guards = Vec::with_capacity(route_ids.len());
            for route_id in &route_ids {
                route_guards.push(self.locks.routes.acquire(*route_id).await);
            }
            let _guard = self.locks.vehicles.acquire(id).await;

            // Asegura NotFound antes de los chequeos de conflicto
            self.get(id).await?;

            if self.assigned_route_ids(id).await? != route_ids {
                debug!(vehicle_id = %id, "Asignaciones cambiaron durante la baja, reintentando");
                continue;
            }

            let active_routes = self.active_route_names(id).await?;
            if !active_routes.is_empty() {
                return Err(AppError::Conflict(format!(
                    "vehicle {} is assigned to active route(s): {}",
                    id,
                    active_routes.join(", ")
                )));
            }

            if self.maintenance.has_scheduled(id).await? {
                return Err(AppError::Conflict(format!(
                    "vehicle {} has scheduled maintenance",
                    id
                )));
            }

            let now = Utc::now();
            for mut route in self.routes.list_by_vehicle(id).await? {
                route.vehicle_id = None;
                route.updated_at = now;
                self.routes.update(route).await?;
            }

            self.vehicles.delete(id).await?;
            self.locks.vehicles.forget(id);
            info!(vehicle_id = %id, released_routes = route_ids.len(), "🗑️ Vehículo eliminado");
            return Ok(());
        }
    }

    async fn assigned_route_ids(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .routes
            .list_by_vehicle(id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn active_route_names(&self, id: Uuid) -> AppResult<Vec<String>> {
        Ok(self
            .routes
            .list_by_vehicle(id)
            .await?
            .into_iter()
            .filter(|r| r.is_active())
            .map(|r| r.name)
            .collect())
    }

    /// Registrar un mantenimiento en el historial del vehículo y fijar el
    /// puntero al próximo vencimiento. El llamador debe tener el lock del
    /// vehículo.
    pub(crate) async fn apply_maintenance_locked(
        &self,
        vehicle_id: Uuid,
        new_record: Option<Uuid>,
        next: Option<NextMaintenance>,
    ) -> AppResult<Vehicle> {
        let mut vehicle = self.get(vehicle_id).await?;
        if let Some(record_id) = new_record {
            if !vehicle.maintenance_history.contains(&record_id) {
                vehicle.maintenance_history.push(record_id);
            }
        }
        vehicle.next_maintenance = next;
        vehicle.updated_at = Utc::now();
        self.vehicles.update(vehicle).await
    }
}
