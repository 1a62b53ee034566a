use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::alert::Alert;
use crate::utils::errors::{not_found_error, AppResult};

/// Almacenamiento de alertas
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert(&self, alert: Alert) -> AppResult<Alert>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Alert>>;
    async fn list(&self) -> AppResult<Vec<Alert>>;
    async fn update(&self, alert: Alert) -> AppResult<Alert>;
}

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<HashMap<Uuid, Alert>>,
}

impl InMemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn insert(&self, alert: Alert) -> AppResult<Alert> {
        self.alerts.write().insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Alert>> {
        Ok(self.alerts.read().get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self.alerts.read().values().cloned().collect();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(alerts)
    }

    async fn update(&self, alert: Alert) -> AppResult<Alert> {
        let mut alerts = self.alerts.write();
        match alerts.get_mut(&alert.id) {
            Some(slot) => {
                *slot = alert.clone();
                Ok(alert)
            }
            None => Err(not_found_error("Alert", &alert.id.to_string())),
        }
    }
}
