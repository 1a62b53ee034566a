//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del núcleo de flota
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::vehicle::VehicleStatus;

/// Errores principales de la aplicación
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: VehicleStatus, to: VehicleStatus },

    #[error("Capacity exceeded: {required} students assigned, vehicle capacity is {capacity}")]
    CapacityExceeded { required: u32, capacity: u32 },

    #[error("Vehicle unavailable: {0}")]
    VehicleUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Stale telemetry: {0}")]
    StaleTelemetry(String),

    #[error("Anomalous reading: {0}")]
    AnomalousReading(String),

    #[error("Telemetry source error: {0}")]
    Telemetry(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
                format!("{} ({})", field, codes.join(", "))
            })
            .collect();
        AppError::Validation(format!("invalid fields: {}", fields.join("; ")))
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    code: String,
}

impl AppError {
    /// Código estable que viaja en el cuerpo JSON
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            AppError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            AppError::VehicleUnavailable(_) => "VEHICLE_UNAVAILABLE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::StaleTelemetry(_) => "STALE_TELEMETRY",
            AppError::AnomalousReading(_) => "ANOMALOUS_READING",
            AppError::Telemetry(_) => "TELEMETRY_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            AppError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, "Invalid State Transition")
            }
            AppError::CapacityExceeded { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Capacity Exceeded")
            }
            AppError::VehicleUnavailable(_) => (StatusCode::CONFLICT, "Vehicle Unavailable"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            AppError::StaleTelemetry(_) => (StatusCode::CONFLICT, "Stale Telemetry"),
            AppError::AnomalousReading(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Anomalous Reading")
            }
            AppError::Telemetry(_) => (StatusCode::BAD_GATEWAY, "Telemetry Error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status();

        if status.is_server_error() {
            tracing::error!(code = self.code(), "❌ {}", self);
        } else {
            tracing::debug!(code = self.code(), "request rejected: {}", self);
        }

        let message = match &self {
            AppError::Internal(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &str, message: &str) -> AppError {
    AppError::Validation(format!("{}: {}", field, message))
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de conflicto
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}
