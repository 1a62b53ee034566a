use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::maintenance::{MaintenanceKind, YearMonth};
use crate::utils::validation::validate_not_blank;

// Request para programar un mantenimiento
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScheduleMaintenanceRequest {
    pub kind: MaintenanceKind,

    #[validate(custom = "validate_not_blank", length(max = 500))]
    pub description: String,

    pub cost: Decimal,

    pub performed_at: DateTime<Utc>,

    pub next_due_at: DateTime<Utc>,
}

// Request para completar un mantenimiento
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteMaintenanceRequest {
    /// Costo real; conserva el costo estimado si se omite
    pub actual_cost: Option<Decimal>,

    /// Si viene, se crea un registro sucesor programado con este vencimiento
    pub next_due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationQuery {
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyCostQuery {
    pub vehicle_id: uuid::Uuid,
    pub month: YearMonth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CostReportQuery {
    pub month: YearMonth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DueQuery {
    /// Días hacia adelante; el umbral de alertas si se omite
    pub days: Option<i64>,
    pub now: Option<DateTime<Utc>>,
}
