//! Modelo de Alert

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::vehicle::DocumentKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Entidad a la que se refiere una alerta
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AlertSubject {
    Vehicle(Uuid),
    MaintenanceRecord(Uuid),
}

/// Regla que originó la alerta
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertRule {
    MaintenanceOverdue,
    MaintenanceDueSoon,
    VehicleOffline,
    AnomalousReading,
    DocumentExpired(DocumentKind),
    DocumentExpiring(DocumentKind),
}

impl AlertRule {
    pub fn severity(&self) -> Severity {
        match self {
            AlertRule::MaintenanceOverdue | AlertRule::DocumentExpired(_) => Severity::Critical,
            AlertRule::MaintenanceDueSoon
            | AlertRule::VehicleOffline
            | AlertRule::DocumentExpiring(_) => Severity::Warning,
            AlertRule::AnomalousReading => Severity::Info,
        }
    }

    /// Familia de evaluación a la que pertenece la regla
    pub fn family(&self) -> RuleFamily {
        match self {
            AlertRule::VehicleOffline | AlertRule::AnomalousReading => RuleFamily::Tracking,
            _ => RuleFamily::Maintenance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFamily {
    Maintenance,
    Tracking,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub subject: AlertSubject,
    /// Vehículo al que se refiere la alerta (también para alertas de mantenimiento)
    pub vehicle_id: Uuid,
    pub rule: AlertRule,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
}
