use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::maintenance::MaintenanceRecord;
use crate::utils::errors::{not_found_error, AppResult};

/// Almacenamiento de registros de mantenimiento
#[async_trait]
pub trait MaintenanceRepository: Send + Sync {
    async fn insert(&self, record: MaintenanceRecord) -> AppResult<MaintenanceRecord>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MaintenanceRecord>>;
    async fn list(&self) -> AppResult<Vec<MaintenanceRecord>>;
    async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<MaintenanceRecord>>;
    async fn update(&self, record: MaintenanceRecord) -> AppResult<MaintenanceRecord>;

    async fn has_scheduled(&self, vehicle_id: Uuid) -> AppResult<bool> {
        Ok(self
            .list_by_vehicle(vehicle_id)
            .await?
            .iter()
            .any(|r| r.is_scheduled()))
    }
}

#[derive(Default)]
pub struct InMemoryMaintenanceRepository {
    records: RwLock<HashMap<Uuid, MaintenanceRecord>>,
}

impl InMemoryMaintenanceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MaintenanceRepository for InMemoryMaintenanceRepository {
    async fn insert(&self, record: MaintenanceRecord) -> AppResult<MaintenanceRecord> {
        self.records.write().insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MaintenanceRecord>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<MaintenanceRecord>> {
        let mut records: Vec<MaintenanceRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<MaintenanceRecord>> {
        let mut records: Vec<MaintenanceRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn update(&self, record: MaintenanceRecord) -> AppResult<MaintenanceRecord> {
        let mut records = self.records.write();
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(record)
            }
            None => Err(not_found_error("Maintenance record", &record.id.to_string())),
        }
    }
}
