//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle, su máquina de estados y los
//! filtros de búsqueda usados por los dashboards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Estado del vehículo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Active,
    Maintenance,
    Inactive,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::Inactive => "inactive",
        }
    }

    /// `maintenance -> inactive` no está permitido: el vehículo debe volver
    /// a `active` antes de darse de baja.
    pub fn can_transition_to(&self, next: VehicleStatus) -> bool {
        matches!(
            (self, next),
            (VehicleStatus::Active, VehicleStatus::Maintenance)
                | (VehicleStatus::Maintenance, VehicleStatus::Active)
                | (VehicleStatus::Active, VehicleStatus::Inactive)
                | (VehicleStatus::Inactive, VehicleStatus::Active)
        )
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de documento con fecha de vencimiento
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Insurance,
    Pollution,
    DriverLicense,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Insurance,
        DocumentKind::Pollution,
        DocumentKind::DriverLicense,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Insurance => "insurance",
            DocumentKind::Pollution => "pollution certificate",
            DocumentKind::DriverLicense => "driver license",
        }
    }
}

/// Vencimientos de documentos del vehículo
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VehicleDocuments {
    pub insurance_expiry: Option<NaiveDate>,
    pub pollution_expiry: Option<NaiveDate>,
    pub license_expiry: Option<NaiveDate>,
}

impl VehicleDocuments {
    pub fn expiry(&self, kind: DocumentKind) -> Option<NaiveDate> {
        match kind {
            DocumentKind::Insurance => self.insurance_expiry,
            DocumentKind::Pollution => self.pollution_expiry,
            DocumentKind::DriverLicense => self.license_expiry,
        }
    }

    /// Documentos vencidos en la fecha dada (vencimiento <= fecha)
    pub fn expired_on(&self, date: NaiveDate) -> Vec<DocumentKind> {
        DocumentKind::ALL
            .into_iter()
            .filter(|kind| self.expiry(*kind).map_or(false, |expiry| expiry <= date))
            .collect()
    }
}

/// Puntero al próximo mantenimiento programado
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NextMaintenance {
    pub record_id: Uuid,
    pub due_at: DateTime<Utc>,
}

/// Vehicle principal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub registration_number: String,
    pub capacity: u32,
    pub driver_name: String,
    pub driver_phone: String,
    pub status: VehicleStatus,
    pub model: Option<String>,
    pub manufacture_year: Option<i32>,
    pub fuel_efficiency: Option<f64>,
    pub documents: VehicleDocuments,
    /// Ids de MaintenanceRecord en orden de creación
    pub maintenance_history: Vec<Uuid>,
    pub next_maintenance: Option<NextMaintenance>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filtros para búsqueda de vehículos
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleFilter {
    pub status: Option<VehicleStatus>,
    /// Coincidencia parcial sobre matrícula o conductor
    pub search: Option<String>,
    /// Solo vehículos con algún documento vencido en esta fecha
    pub expired_documents_on: Option<NaiveDate>,
}

impl VehicleFilter {
    pub fn with_status(status: VehicleStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        if let Some(status) = self.status {
            if vehicle.status != status {
                return false;
            }
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = vehicle.registration_number.to_lowercase().contains(&needle)
                || vehicle.driver_name.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(date) = self.expired_documents_on {
            if vehicle.documents.expired_on(date).is_empty() {
                return false;
            }
        }

        true
    }
}
