use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::models::vehicle::{VehicleDocuments, VehicleStatus};
use crate::utils::validation::{validate_not_blank, validate_phone};

// Request para registrar un vehículo
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterVehicleRequest {
    #[validate(custom = "validate_not_blank", length(max = 20))]
    pub registration_number: String,

    #[validate(range(min = 1))]
    pub capacity: i64,

    #[serde(default)]
    #[validate(custom = "validate_not_blank", length(max = 100))]
    pub driver_name: String,

    #[serde(default)]
    #[validate(custom = "validate_phone")]
    pub driver_phone: String,

    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,

    #[validate(range(min = 1950, max = 2100))]
    pub manufacture_year: Option<i32>,

    #[validate(range(min = 0.0))]
    pub fuel_efficiency: Option<f64>,

    #[serde(default)]
    pub documents: VehicleDocuments,
}

// Request para actualizar datos del vehículo (no el estado)
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(custom = "validate_not_blank", length(max = 100))]
    pub driver_name: Option<String>,

    #[validate(custom = "validate_phone")]
    pub driver_phone: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,

    #[validate(range(min = 1950, max = 2100))]
    pub manufacture_year: Option<i32>,

    #[validate(range(min = 0.0))]
    pub fuel_efficiency: Option<f64>,

    pub insurance_expiry: Option<NaiveDate>,
    pub pollution_expiry: Option<NaiveDate>,
    pub license_expiry: Option<NaiveDate>,
}

// Request para cambiar el estado del vehículo
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVehicleStatusRequest {
    pub status: VehicleStatus,
}
