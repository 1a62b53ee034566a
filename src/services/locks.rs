//! Locks por entidad
//!
//! Un mutex asíncrono por id. Los servicios que mutan un vehículo (cambio
//! de estado, asignación a ruta, mantenimiento) toman el lock de ese
//! vehículo, de modo que sus operaciones quedan serializadas. Orden de
//! adquisición: rutas (por id ascendente si son varias) antes que vehículo;
//! nunca dos vehículos a la vez.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct EntityLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        // El guard de DashMap se suelta antes del await
        let lock = self.locks.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    /// Olvidar el lock de una entidad eliminada
    pub fn forget(&self, id: Uuid) {
        self.locks.remove(&id);
    }

    #[cfg(test)]
    pub(crate) fn is_tracked(&self, id: Uuid) -> bool {
        self.locks.contains_key(&id)
    }
}

/// Locks compartidos entre los componentes del núcleo
#[derive(Default)]
pub struct FleetLocks {
    pub vehicles: EntityLocks,
    pub routes: EntityLocks,
}

impl FleetLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
