//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio del núcleo de flota:
//! vehículos, rutas, mantenimiento, ubicaciones y alertas.

pub mod alert;
pub mod location;
pub mod maintenance;
pub mod route;
pub mod vehicle;
