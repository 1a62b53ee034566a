//! Despachador de alertas
//!
//! Evalúa reglas declarativas después de cada clasificación de
//! mantenimiento y de cada tick del feed de seguimiento. Las alertas se
//! deduplican por par (sujeto, regla): mientras la alerta siga pendiente no
//! se crean filas nuevas. Una alerta reconocida vuelve a dispararse (misma
//! fila, `created_at` renovado) solo si su condición desapareció y volvió a
//! ocurrir.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AlertConfig;
use crate::models::alert::{Alert, AlertRule, AlertSubject, RuleFamily};
use crate::models::location::{MovementStatus, TickReport};
use crate::models::maintenance::Classification;
use crate::models::vehicle::{DocumentKind, Vehicle, VehicleFilter};
use crate::repositories::AlertRepository;
use crate::services::notification::NotificationSink;
use crate::services::vehicle_registry::VehicleRegistry;
use crate::utils::errors::{not_found_error, AppResult};

type RuleKey = (AlertSubject, AlertRule);

/// Estado de un par (sujeto, regla)
struct RuleState {
    alert_id: Uuid,
    /// La condición se cumplió en la última evaluación de su familia
    active: bool,
}

struct Firing {
    subject: AlertSubject,
    vehicle_id: Uuid,
    rule: AlertRule,
    message: String,
}

pub struct AlertDispatcher {
    alerts: Arc<dyn AlertRepository>,
    registry: Arc<VehicleRegistry>,
    sink: Arc<dyn NotificationSink>,
    config: AlertConfig,
    rules: Mutex<HashMap<RuleKey, RuleState>>,
}

fn label(vehicles: &HashMap<Uuid, Vehicle>, vehicle_id: Uuid) -> String {
    vehicles
        .get(&vehicle_id)
        .map(|v| v.registration_number.clone())
        .unwrap_or_else(|| vehicle_id.to_string())
}

impl AlertDispatcher {
    pub fn new(
        alerts: Arc<dyn AlertRepository>,
        registry: Arc<VehicleRegistry>,
        sink: Arc<dyn NotificationSink>,
        config: AlertConfig,
    ) -> Self {
        Self {
            alerts,
            registry,
            sink,
            config,
            rules: Mutex::new(HashMap::new()),
        }
    }

    async fn vehicles(&self) -> AppResult<HashMap<Uuid, Vehicle>> {
        Ok(self
            .registry
            .list(&VehicleFilter::default())
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect())
    }

    /// Reglas de mantenimiento y documentos. Devuelve las alertas creadas o
    /// re-armadas en esta evaluación.
    pub async fn on_classification(
        &self,
        classification: &Classification,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Alert>> {
        let vehicles = self.vehicles().await?;
        let mut firings = Vec::new();

        for record in &classification.overdue {
            let days = record.days_overdue(now);
            firings.push(Firing {
                subject: AlertSubject::MaintenanceRecord(record.id),
                vehicle_id: record.vehicle_id,
                rule: AlertRule::MaintenanceOverdue,
                message: format!(
                    "Vehicle {}: maintenance '{}' overdue by {} day(s)",
                    label(&vehicles, record.vehicle_id),
                    record.description,
                    days
                ),
            });
        }

        for record in &classification.upcoming {
            let remaining = record.next_due_at - now;
            if remaining > self.config.warn_threshold {
                // `upcoming` está ordenado por vencimiento
                break;
            }
            firings.push(Firing {
                subject: AlertSubject::MaintenanceRecord(record.id),
                vehicle_id: record.vehicle_id,
                rule: AlertRule::MaintenanceDueSoon,
                message: format!(
                    "Vehicle {}: maintenance '{}' due in {} day(s)",
                    label(&vehicles, record.vehicle_id),
                    record.description,
                    remaining.num_days()
                ),
            });
        }

        let today = now.date_naive();
        let horizon = (now + self.config.warn_threshold).date_naive();
        for vehicle in vehicles.values() {
            for kind in DocumentKind::ALL {
                let Some(expiry) = vehicle.documents.expiry(kind) else {
                    continue;
                };
                let (rule, message) = if expiry <= today {
                    (
                        AlertRule::DocumentExpired(kind),
                        format!(
                            "Vehicle {}: {} expired on {}",
                            vehicle.registration_number,
                            kind.label(),
                            expiry
                        ),
                    )
                } else if expiry <= horizon {
                    (
                        AlertRule::DocumentExpiring(kind),
                        format!(
                            "Vehicle {}: {} expires on {}",
                            vehicle.registration_number,
                            kind.label(),
                            expiry
                        ),
                    )
                } else {
                    continue;
                };
                firings.push(Firing {
                    subject: AlertSubject::Vehicle(vehicle.id),
                    vehicle_id: vehicle.id,
                    rule,
                    message,
                });
            }
        }

        self.evaluate(RuleFamily::Maintenance, firings, now).await
    }

    /// Reglas de seguimiento: offline prolongado y lecturas anómalas
    pub async fn on_tick(&self, report: &TickReport, now: DateTime<Utc>) -> AppResult<Vec<Alert>> {
        let vehicles = self.vehicles().await?;
        let mut firings = Vec::new();

        for location in &report.locations {
            let Some(since) = location.offline_since else {
                continue;
            };
            if location.status == MovementStatus::Offline
                && now - since > self.config.offline_alert_window
            {
                firings.push(Firing {
                    subject: AlertSubject::Vehicle(location.vehicle_id),
                    vehicle_id: location.vehicle_id,
                    rule: AlertRule::VehicleOffline,
                    message: format!(
                        "Vehicle {} offline for {} min (last signal at {})",
                        label(&vehicles, location.vehicle_id),
                        (now - since).num_minutes(),
                        location.accepted_at
                    ),
                });
            }
        }

        for anomaly in &report.anomalies {
            firings.push(Firing {
                subject: AlertSubject::Vehicle(anomaly.vehicle_id),
                vehicle_id: anomaly.vehicle_id,
                rule: AlertRule::AnomalousReading,
                message: format!(
                    "Vehicle {}: {}",
                    label(&vehicles, anomaly.vehicle_id),
                    anomaly.description
                ),
            });
        }

        self.evaluate(RuleFamily::Tracking, firings, now).await
    }

    async fn evaluate(
        &self,
        family: RuleFamily,
        firings: Vec<Firing>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Alert>> {
        let mut rules = self.rules.lock().await;
        let mut fired: HashSet<RuleKey> = HashSet::new();
        let mut emitted = Vec::new();

        for firing in firings {
            let key = (firing.subject, firing.rule);
            if !fired.insert(key) {
                continue;
            }

            let existing = match rules.get(&key) {
                Some(state) => self
                    .alerts
                    .find_by_id(state.alert_id)
                    .await?
                    .map(|alert| (alert, state.active)),
                None => None,
            };

            match existing {
                None => {
                    let alert = Alert {
                        id: Uuid::new_v4(),
                        subject: firing.subject,
                        vehicle_id: firing.vehicle_id,
                        rule: firing.rule,
                        severity: firing.rule.severity(),
                        message: firing.message,
                        created_at: now,
                        acknowledged: false,
                    };
                    let alert = self.alerts.insert(alert).await?;
                    rules.insert(
                        key,
                        RuleState {
                            alert_id: alert.id,
                            active: true,
                        },
                    );
                    emitted.push(alert);
                }
                Some((mut alert, _)) if !alert.acknowledged => {
                    // Sigue pendiente: solo se actualiza el texto
                    if alert.message != firing.message {
                        alert.message = firing.message;
                        self.alerts.update(alert).await?;
                    }
                }
                Some((_, true)) => {
                    // Reconocida y la condición nunca desapareció
                }
                Some((mut alert, false)) => {
                    alert.acknowledged = false;
                    alert.created_at = now;
                    alert.message = firing.message;
                    let alert = self.alerts.update(alert).await?;
                    debug!(alert_id = %alert.id, "Alerta re-armada");
                    emitted.push(alert);
                }
            }

            if let Some(state) = rules.get_mut(&key) {
                state.active = true;
            }
        }

        for (key, state) in rules.iter_mut() {
            if key.1.family() == family && !fired.contains(key) {
                state.active = false;
            }
        }
        drop(rules);

        for alert in &emitted {
            self.sink.notify(alert).await;
        }
        if !emitted.is_empty() {
            info!(count = emitted.len(), family = ?family, "🔔 Alertas emitidas");
        }
        Ok(emitted)
    }

    /// Alertas sin reconocer, de mayor a menor severidad
    pub async fn pending(&self) -> AppResult<Vec<Alert>> {
        let mut pending: Vec<Alert> = self
            .alerts
            .list()
            .await?
            .into_iter()
            .filter(|a| !a.acknowledged)
            .collect();
        pending.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(pending)
    }

    pub async fn acknowledge(&self, alert_id: Uuid) -> AppResult<Alert> {
        let _rules = self.rules.lock().await;

        let mut alert = self
            .alerts
            .find_by_id(alert_id)
            .await?
            .ok_or_else(|| not_found_error("Alert", &alert_id.to_string()))?;
        if alert.acknowledged {
            return Ok(alert);
        }

        alert.acknowledged = true;
        let alert = self.alerts.update(alert).await?;
        info!(alert_id = %alert_id, "Alerta reconocida");
        Ok(alert)
    }
}
