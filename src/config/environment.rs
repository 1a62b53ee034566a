//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno. Todas las claves son
//! opcionales; un valor mal formado es un error de arranque.

use anyhow::{Context, Result};
use chrono::{Duration, FixedOffset, Offset, Utc};
use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Fuente de telemetría a usar por el binario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryMode {
    Simulated,
    Push,
}

impl FromStr for TelemetryMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(TelemetryMode::Simulated),
            "push" => Ok(TelemetryMode::Push),
            other => Err(anyhow::anyhow!("unknown telemetry mode '{}'", other)),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub tick_interval_secs: u64,
    pub staleness_window_secs: u64,
    pub telemetry_timeout_ms: u64,
    pub max_clock_skew_secs: i64,
    pub default_eta_minutes: i64,
    pub min_speed_kmh: f64,
    pub stopped_speed_kmh: f64,
    pub utc_offset_minutes: i32,
    pub snapshot_channel_capacity: usize,
    pub telemetry_mode: TelemetryMode,
    pub warn_threshold_days: i64,
    pub offline_alert_window_secs: i64,
    pub maintenance_sweep_secs: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            tick_interval_secs: 5,
            staleness_window_secs: 15,
            telemetry_timeout_ms: 2000,
            max_clock_skew_secs: 30,
            default_eta_minutes: 15,
            min_speed_kmh: 0.5,
            stopped_speed_kmh: 5.0,
            utc_offset_minutes: 0,
            snapshot_channel_capacity: 64,
            telemetry_mode: TelemetryMode::Simulated,
            warn_threshold_days: 7,
            offline_alert_window_secs: 900,
            maintenance_sweep_secs: 60,
        }
    }
}

fn check_range<T>(key: &str, value: T, range: RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + Display,
{
    if !range.contains(&value) {
        anyhow::bail!(
            "{} out of range: {} (expected {}..={})",
            key,
            value,
            range.start(),
            range.end()
        );
    }
    Ok(())
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} must be a valid value, got '{}'", key, raw)),
        _ => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Cargar configuración desde variables de entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let tick_interval_secs = var_or("TRACKING_TICK_SECS", defaults.tick_interval_secs)?;
        check_range("TRACKING_TICK_SECS", tick_interval_secs, 1..=3_600)?;

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            environment: var_or("ENVIRONMENT", defaults.environment)?,
            port: var_or("PORT", defaults.port)?,
            host: var_or("HOST", defaults.host)?,
            cors_origins,
            tick_interval_secs,
            staleness_window_secs: var_or("TRACKING_STALENESS_SECS", tick_interval_secs * 3)?,
            telemetry_timeout_ms: var_or("TELEMETRY_TIMEOUT_MS", defaults.telemetry_timeout_ms)?,
            max_clock_skew_secs: var_or("TELEMETRY_MAX_SKEW_SECS", defaults.max_clock_skew_secs)?,
            default_eta_minutes: var_or(
                "TRACKING_DEFAULT_ETA_MINUTES",
                defaults.default_eta_minutes,
            )?,
            min_speed_kmh: var_or("TRACKING_MIN_SPEED_KMH", defaults.min_speed_kmh)?,
            stopped_speed_kmh: var_or("TRACKING_STOPPED_SPEED_KMH", defaults.stopped_speed_kmh)?,
            utc_offset_minutes: var_or("SCHOOL_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes)?,
            snapshot_channel_capacity: var_or(
                "SNAPSHOT_CHANNEL_CAPACITY",
                defaults.snapshot_channel_capacity,
            )?,
            telemetry_mode: var_or("TELEMETRY_MODE", defaults.telemetry_mode)?,
            warn_threshold_days: var_or("ALERT_WARN_THRESHOLD_DAYS", defaults.warn_threshold_days)?,
            offline_alert_window_secs: var_or(
                "ALERT_OFFLINE_WINDOW_SECS",
                defaults.offline_alert_window_secs,
            )?,
            maintenance_sweep_secs: var_or("MAINTENANCE_SWEEP_SECS", defaults.maintenance_sweep_secs)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rangos aceptados para cada clave
    pub fn validate(&self) -> Result<()> {
        check_range("TRACKING_TICK_SECS", self.tick_interval_secs, 1..=3_600)?;
        check_range("TRACKING_STALENESS_SECS", self.staleness_window_secs, 1..=86_400)?;
        check_range("TELEMETRY_TIMEOUT_MS", self.telemetry_timeout_ms, 1..=600_000)?;
        check_range("TELEMETRY_MAX_SKEW_SECS", self.max_clock_skew_secs, 0..=3_600)?;
        check_range("TRACKING_DEFAULT_ETA_MINUTES", self.default_eta_minutes, 1..=1_440)?;
        check_range("TRACKING_MIN_SPEED_KMH", self.min_speed_kmh, 0.0..=200.0)?;
        check_range("TRACKING_STOPPED_SPEED_KMH", self.stopped_speed_kmh, 0.0..=200.0)?;
        check_range("SCHOOL_UTC_OFFSET_MINUTES", self.utc_offset_minutes, -1_439..=1_439)?;
        check_range("SNAPSHOT_CHANNEL_CAPACITY", self.snapshot_channel_capacity, 1..=65_536)?;
        check_range("ALERT_WARN_THRESHOLD_DAYS", self.warn_threshold_days, 0..=3_650)?;
        check_range("ALERT_OFFLINE_WINDOW_SECS", self.offline_alert_window_secs, 0..=604_800)?;
        check_range("MAINTENANCE_SWEEP_SECS", self.maintenance_sweep_secs, 1..=86_400)?;
        Ok(())
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tracking(&self) -> TrackingConfig {
        TrackingConfig {
            tick_interval: std::time::Duration::from_secs(self.tick_interval_secs),
            staleness_window: Duration::seconds(self.staleness_window_secs as i64),
            telemetry_timeout: std::time::Duration::from_millis(self.telemetry_timeout_ms),
            max_clock_skew: Duration::seconds(self.max_clock_skew_secs),
            default_eta: Duration::minutes(self.default_eta_minutes),
            min_speed_kmh: self.min_speed_kmh,
            stopped_speed_kmh: self.stopped_speed_kmh,
            school_offset: FixedOffset::east_opt(self.utc_offset_minutes * 60)
                .unwrap_or_else(|| Utc.fix()),
            snapshot_channel_capacity: self.snapshot_channel_capacity.max(1),
        }
    }

    pub fn alerts(&self) -> AlertConfig {
        AlertConfig {
            warn_threshold: Duration::days(self.warn_threshold_days),
            offline_alert_window: Duration::seconds(self.offline_alert_window_secs),
        }
    }
}

/// Parámetros del feed de seguimiento
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub tick_interval: std::time::Duration,
    pub staleness_window: Duration,
    pub telemetry_timeout: std::time::Duration,
    /// Adelanto máximo aceptado del reloj del dispositivo
    pub max_clock_skew: Duration,
    /// ETA usada cuando la velocidad no permite calcularla
    pub default_eta: Duration,
    /// Epsilon de velocidad para el cálculo de ETA
    pub min_speed_kmh: f64,
    /// Por encima de esta velocidad un reporte `stopped` es inconsistente
    pub stopped_speed_kmh: f64,
    /// Zona horaria en la que están expresadas las horas de parada
    pub school_offset: FixedOffset,
    pub snapshot_channel_capacity: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        EnvironmentConfig::default().tracking()
    }
}

/// Umbrales de alertas
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub warn_threshold: Duration,
    pub offline_alert_window: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        EnvironmentConfig::default().alerts()
    }
}
