//! Modelo de MaintenanceRecord
//!
//! Registros de mantenimiento, su clasificación por fecha de vencimiento
//! y el tipo `YearMonth` usado para agregar costos mensuales.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

/// Tipo de mantenimiento
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceKind {
    Regular,
    Repair,
    Emergency,
}

/// Estado del registro
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceStatus {
    Scheduled,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceRecord {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub kind: MaintenanceKind,
    pub description: String,
    pub cost: Decimal,
    pub performed_at: DateTime<Utc>,
    pub next_due_at: DateTime<Utc>,
    pub status: MaintenanceStatus,
    pub completed_at: Option<DateTime<Utc>>,
    /// Registro programado creado al completar este
    pub successor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceRecord {
    pub fn is_scheduled(&self) -> bool {
        self.status == MaintenanceStatus::Scheduled
    }

    /// Días completos transcurridos desde el vencimiento (0 si no venció)
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        (now - self.next_due_at).num_days().max(0)
    }
}

/// Partición de registros respecto a un instante de referencia
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification {
    pub overdue: Vec<MaintenanceRecord>,
    pub upcoming: Vec<MaintenanceRecord>,
    pub history: Vec<MaintenanceRecord>,
}

/// Costo agregado de mantenimiento de un vehículo
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleCost {
    pub vehicle_id: Uuid,
    pub total: Decimal,
    pub records: usize,
}

/// Mes calendario, formato `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!("month out of range: {}", month)));
        }
        Ok(Self { year, month })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at.year() == self.year && at.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("expected YYYY-MM, got '{}'", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
