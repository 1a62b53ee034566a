//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación
//! y cálculos geográficos comunes.

pub mod errors;
pub mod geo;
pub mod validation;

pub use errors::{AppError, AppResult};
