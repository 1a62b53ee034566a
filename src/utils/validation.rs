//! Utilidades de validación
//!
//! Funciones helper para validación de datos que `validator` no cubre
//! con sus atributos derive.

use chrono::{DateTime, NaiveTime, Utc};
use validator::ValidationError;

/// Validar que un string no esté vacío (ignorando espacios)
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de teléfono (básico)
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let clean_phone = value.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
    if clean_phone.len() < 7 || clean_phone.len() > 15 {
        let mut error = ValidationError::new("phone");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar latitud en grados
pub fn validate_latitude(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(-90.0..=90.0).contains(&value) {
        let mut error = ValidationError::new("latitude");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

/// Validar longitud en grados
pub fn validate_longitude(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(-180.0..=180.0).contains(&value) {
        let mut error = ValidationError::new("longitude");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

/// Validar que una ventana horaria tenga inicio antes que fin
pub fn validate_time_window(
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            let mut error = ValidationError::new("time_window");
            error.add_param("start".into(), &start.to_string());
            error.add_param("end".into(), &end.to_string());
            return Err(error);
        }
    }
    Ok(())
}

/// Validar que una fecha sea estrictamente posterior a otra
pub fn validate_strictly_after(
    later: DateTime<Utc>,
    earlier: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if later <= earlier {
        let mut error = ValidationError::new("strictly_after");
        error.add_param("later".into(), &later.to_rfc3339());
        error.add_param("earlier".into(), &earlier.to_rfc3339());
        return Err(error);
    }
    Ok(())
}
