//! Notificaciones de alertas
//!
//! Destino de cada alerta creada o re-armada por el despachador.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::alert::{Alert, Severity};

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, alert: &Alert);
}

/// Emite las alertas por el log estructurado
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, alert: &Alert) {
        match alert.severity {
            Severity::Critical => warn!(
                alert_id = %alert.id,
                vehicle_id = %alert.vehicle_id,
                rule = ?alert.rule,
                "🚨 {}", alert.message
            ),
            Severity::Warning => warn!(
                alert_id = %alert.id,
                vehicle_id = %alert.vehicle_id,
                rule = ?alert.rule,
                "⚠️ {}", alert.message
            ),
            Severity::Info => info!(
                alert_id = %alert.id,
                vehicle_id = %alert.vehicle_id,
                rule = ?alert.rule,
                "ℹ️ {}", alert.message
            ),
        }
    }
}
