use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use school_fleet::config::environment::{EnvironmentConfig, TelemetryMode};
use school_fleet::services::background::{run_maintenance_sweep, run_tracking_loop};
use school_fleet::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚌 School Fleet - seguimiento y mantenimiento");
    info!("============================================");

    let config = EnvironmentConfig::from_env()?;
    let addr: SocketAddr = config.server_url().parse()?;
    let sweep_every = Duration::from_secs(config.maintenance_sweep_secs.max(1));
    if config.is_development() && config.cors_origins.is_empty() {
        info!("🔧 Modo desarrollo: CORS abierto a cualquier origen");
    }
    let mode = match config.telemetry_mode {
        TelemetryMode::Simulated => "simulated",
        TelemetryMode::Push => "push",
    };

    let state = AppState::new(config);
    let app = create_router(state.clone());

    // Tareas en segundo plano
    let tracking = tokio::spawn(run_tracking_loop(
        state.feed.clone(),
        state.dispatcher.clone(),
        state.shutdown_receiver(),
    ));
    let sweep = tokio::spawn(run_maintenance_sweep(
        state.scheduler.clone(),
        state.dispatcher.clone(),
        sweep_every,
        state.shutdown_receiver(),
    ));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("📡 Telemetría: {}", mode);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health");
    info!("   /api/vehicles     - Registro de vehículos");
    info!("   /api/routes       - Rutas y paradas");
    info!("   /api/maintenance  - Mantenimiento y costos");
    info!("   /api/tracking     - Ubicaciones en vivo (SSE en /stream)");
    info!("   /api/alerts       - Alertas pendientes");
    info!("   /api/overview     - Resumen de la flota");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // La señal cierra también los streams SSE abiertos
    let stopping = state.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            stopping.begin_shutdown();
        })
        .await;

    // Detener loops: el tick en curso termina antes de salir
    state.begin_shutdown();
    for (name, task) in [("seguimiento", tracking), ("mantenimiento", sweep)] {
        if let Err(e) = task.await {
            error!("❌ La tarea de {} terminó con error: {}", name, e);
        }
    }

    if let Err(e) = served {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
