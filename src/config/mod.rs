//! Configuración del proyecto
//!
//! Este módulo contiene las variables de entorno y los parámetros
//! derivados para el feed de seguimiento y las alertas.

pub mod environment;

pub use environment::*;
