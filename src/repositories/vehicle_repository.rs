use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::vehicle::Vehicle;
use crate::utils::errors::{conflict_error, not_found_error, AppResult};

/// Almacenamiento de vehículos
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Inserta el vehículo; falla con `Conflict` si la matrícula ya existe
    async fn insert(&self, vehicle: Vehicle) -> AppResult<Vehicle>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn list(&self) -> AppResult<Vec<Vehicle>>;
    async fn update(&self, vehicle: Vehicle) -> AppResult<Vehicle>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Default)]
pub struct InMemoryVehicleRepository {
    vehicles: RwLock<HashMap<Uuid, Vehicle>>,
}

impl InMemoryVehicleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_registration(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn insert(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let mut vehicles = self.vehicles.write();
        if vehicles
            .values()
            .any(|v| same_registration(&v.registration_number, &vehicle.registration_number))
        {
            return Err(conflict_error(
                "Vehicle",
                "registration number",
                &vehicle.registration_number,
            ));
        }
        vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.vehicles.read().get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self.vehicles.read().values().cloned().collect();
        vehicles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(vehicles)
    }

    async fn update(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let mut vehicles = self.vehicles.write();
        match vehicles.get_mut(&vehicle.id) {
            Some(slot) => {
                *slot = vehicle.clone();
                Ok(vehicle)
            }
            None => Err(not_found_error("Vehicle", &vehicle.id.to_string())),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.vehicles
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))
    }
}
