//! Tareas en segundo plano
//!
//! El loop de seguimiento y el barrido de mantenimiento. Ambos alimentan al
//! despachador de alertas y terminan cuando la señal de apagado cambia; un
//! tick en curso siempre termina antes de salir.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::services::alert_dispatcher::AlertDispatcher;
use crate::services::maintenance_scheduler::MaintenanceScheduler;
use crate::services::tracking_feed::LiveTrackingFeed;

pub async fn run_tracking_loop(
    feed: Arc<LiveTrackingFeed>,
    dispatcher: Arc<AlertDispatcher>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(feed.config().tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(every_secs = feed.config().tick_interval.as_secs(), "📡 Loop de seguimiento iniciado");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Utc::now();
                match feed.tick_at(now).await {
                    Ok(report) => {
                        if let Err(e) = dispatcher.on_tick(&report, now).await {
                            error!("❌ Error evaluando alertas de seguimiento: {}", e);
                        }
                    }
                    Err(e) => error!("❌ Error en tick de seguimiento: {}", e),
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    info!("🛑 Loop de seguimiento detenido");
}

pub async fn run_maintenance_sweep(
    scheduler: Arc<MaintenanceScheduler>,
    dispatcher: Arc<AlertDispatcher>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(every_secs = every.as_secs(), "🔧 Barrido de mantenimiento iniciado");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Utc::now();
                match scheduler.classify(now).await {
                    Ok(classification) => {
                        if let Err(e) = dispatcher.on_classification(&classification, now).await {
                            error!("❌ Error evaluando alertas de mantenimiento: {}", e);
                        }
                    }
                    Err(e) => error!("❌ Error clasificando mantenimiento: {}", e),
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    info!("🛑 Barrido de mantenimiento detenido");
}
