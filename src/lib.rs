//! School fleet
//!
//! Núcleo de seguimiento de flota escolar y planificación de
//! mantenimiento: registro de vehículos, grafo de rutas, planificador de
//! mantenimiento, feed de seguimiento en vivo y despachador de alertas,
//! expuestos como servicio HTTP.

pub mod config;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use routes::create_router;
pub use state::AppState;
