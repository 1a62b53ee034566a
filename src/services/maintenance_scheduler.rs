//! Planificador de mantenimiento
//!
//! Este módulo es dueño de los registros de mantenimiento: los programa, los
//! completa y los clasifica en vencidos / próximos / historial respecto a un
//! instante de referencia. También agrega los costos mensuales.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::dto::maintenance_dto::{CompleteMaintenanceRequest, ScheduleMaintenanceRequest};
use crate::models::maintenance::{
    Classification, MaintenanceRecord, MaintenanceStatus, VehicleCost, YearMonth,
};
use crate::models::vehicle::NextMaintenance;
use crate::repositories::MaintenanceRepository;
use crate::services::locks::FleetLocks;
use crate::services::vehicle_registry::VehicleRegistry;
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};
use crate::utils::validation::validate_strictly_after;

pub struct MaintenanceScheduler {
    records: Arc<dyn MaintenanceRepository>,
    registry: Arc<VehicleRegistry>,
    locks: Arc<FleetLocks>,
}

fn earliest_due(records: &[MaintenanceRecord]) -> Option<NextMaintenance> {
    records
        .iter()
        .filter(|r| r.is_scheduled())
        .min_by(|a, b| a.next_due_at.cmp(&b.next_due_at).then(a.id.cmp(&b.id)))
        .map(|r| NextMaintenance {
            record_id: r.id,
            due_at: r.next_due_at,
        })
}

fn aggregate<'a, I>(records: I) -> Vec<VehicleCost>
where
    I: Iterator<Item = &'a MaintenanceRecord>,
{
    let mut totals: HashMap<Uuid, VehicleCost> = HashMap::new();
    for record in records {
        let entry = totals.entry(record.vehicle_id).or_insert(VehicleCost {
            vehicle_id: record.vehicle_id,
            total: Decimal::ZERO,
            records: 0,
        });
        entry.total += record.cost;
        entry.records += 1;
    }

    let mut costs: Vec<VehicleCost> = totals.into_values().collect();
    costs.sort_by(|a, b| b.total.cmp(&a.total).then(a.vehicle_id.cmp(&b.vehicle_id)));
    costs
}

impl MaintenanceScheduler {
    pub fn new(
        records: Arc<dyn MaintenanceRepository>,
        registry: Arc<VehicleRegistry>,
        locks: Arc<FleetLocks>,
    ) -> Self {
        Self {
            records,
            registry,
            locks,
        }
    }

    pub async fn schedule(
        &self,
        vehicle_id: Uuid,
        request: ScheduleMaintenanceRequest,
    ) -> AppResult<MaintenanceRecord> {
        request.validate()?;
        validate_strictly_after(request.next_due_at, request.performed_at)
            .map_err(|_| validation_error("next_due_at", "must be after performed_at"))?;
        if request.cost < Decimal::ZERO {
            return Err(validation_error("cost", "must not be negative"));
        }

        let _guard = self.locks.vehicles.acquire(vehicle_id).await;
        self.registry.get(vehicle_id).await?;

        let record = MaintenanceRecord {
            id: Uuid::new_v4(),
            vehicle_id,
            kind: request.kind,
            description: request.description.trim().to_string(),
            cost: request.cost,
            performed_at: request.performed_at,
            next_due_at: request.next_due_at,
            status: MaintenanceStatus::Scheduled,
            completed_at: None,
            successor_id: None,
            created_at: Utc::now(),
        };
        let record = self.records.insert(record).await?;

        let next = earliest_due(&self.records.list_by_vehicle(vehicle_id).await?);
        self.registry
            .apply_maintenance_locked(vehicle_id, Some(record.id), next)
            .await?;

        info!(record_id = %record.id, vehicle_id = %vehicle_id, due = %record.next_due_at, "🔧 Mantenimiento programado");
        Ok(record)
    }

    /// Completar un registro programado. Un segundo intento sobre el mismo
    /// id falla con `NotFound` sin tocar el resultado del primero.
    pub async fn complete(
        &self,
        record_id: Uuid,
        request: CompleteMaintenanceRequest,
    ) -> AppResult<MaintenanceRecord> {
        if request.actual_cost.map_or(false, |c| c < Decimal::ZERO) {
            return Err(validation_error("actual_cost", "must not be negative"));
        }

        let vehicle_id = self.get(record_id).await?.vehicle_id;
        let _guard = self.locks.vehicles.acquire(vehicle_id).await;

        // Releer bajo el lock: otra llamada pudo completarlo mientras tanto
        let mut record = self.get(record_id).await?;
        if !record.is_scheduled() {
            return Err(AppError::NotFound(format!(
                "Scheduled maintenance record {} not found (already completed)",
                record_id
            )));
        }

        let now = Utc::now();
        if let Some(next_due_at) = request.next_due_at {
            validate_strictly_after(next_due_at, now)
                .map_err(|_| validation_error("next_due_at", "must be in the future"))?;
        }

        let successor = match request.next_due_at {
            Some(next_due_at) => {
                let successor = MaintenanceRecord {
                    id: Uuid::new_v4(),
                    vehicle_id,
                    kind: record.kind,
                    description: record.description.clone(),
                    cost: Decimal::ZERO,
                    performed_at: now,
                    next_due_at,
                    status: MaintenanceStatus::Scheduled,
                    completed_at: None,
                    successor_id: None,
                    created_at: now,
                };
                Some(self.records.insert(successor).await?)
            }
            None => None,
        };

        record.status = MaintenanceStatus::Completed;
        record.completed_at = Some(now);
        record.successor_id = successor.as_ref().map(|s| s.id);
        if let Some(cost) = request.actual_cost {
            record.cost = cost;
        }
        let record = self.records.update(record).await?;

        let next = earliest_due(&self.records.list_by_vehicle(vehicle_id).await?);
        self.registry
            .apply_maintenance_locked(vehicle_id, successor.map(|s| s.id), next)
            .await?;

        info!(record_id = %record_id, vehicle_id = %vehicle_id, cost = %record.cost, "✅ Mantenimiento completado");
        Ok(record)
    }

    pub async fn get(&self, record_id: Uuid) -> AppResult<MaintenanceRecord> {
        self.records
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| not_found_error("Maintenance record", &record_id.to_string()))
    }

    pub async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<MaintenanceRecord>> {
        self.records.list_by_vehicle(vehicle_id).await
    }

    /// Particionar los registros respecto a `now`
    pub async fn classify(&self, now: DateTime<Utc>) -> AppResult<Classification> {
        let mut classification = Classification::default();

        for record in self.records.list().await? {
            match record.status {
                MaintenanceStatus::Scheduled if record.next_due_at <= now => {
                    classification.overdue.push(record)
                }
                MaintenanceStatus::Scheduled => classification.upcoming.push(record),
                MaintenanceStatus::Completed => classification.history.push(record),
            }
        }

        let by_due = |a: &MaintenanceRecord, b: &MaintenanceRecord| {
            a.next_due_at.cmp(&b.next_due_at).then(a.id.cmp(&b.id))
        };
        classification.overdue.sort_by(by_due);
        classification.upcoming.sort_by(by_due);
        classification
            .history
            .sort_by(|a, b| b.performed_at.cmp(&a.performed_at).then(a.id.cmp(&b.id)));

        debug!(
            overdue = classification.overdue.len(),
            upcoming = classification.upcoming.len(),
            history = classification.history.len(),
            "Clasificación de mantenimiento"
        );
        Ok(classification)
    }

    /// Registros programados que vencen en `(now, now + days]`
    pub async fn due_within(&self, now: DateTime<Utc>, days: i64) -> AppResult<Vec<MaintenanceRecord>> {
        let horizon = now + Duration::days(days);
        Ok(self
            .classify(now)
            .await?
            .upcoming
            .into_iter()
            .filter(|r| r.next_due_at <= horizon)
            .collect())
    }

    /// Suma del costo de los registros completados del vehículo cuyo
    /// `performed_at` cae en el mes indicado
    pub async fn monthly_cost(&self, vehicle_id: Uuid, month: YearMonth) -> AppResult<Decimal> {
        Ok(self
            .records
            .list_by_vehicle(vehicle_id)
            .await?
            .iter()
            .filter(|r| r.status == MaintenanceStatus::Completed && month.contains(r.performed_at))
            .map(|r| r.cost)
            .sum())
    }

    pub async fn monthly_cost_report(&self, month: YearMonth) -> AppResult<Vec<VehicleCost>> {
        let records = self.records.list().await?;
        Ok(aggregate(records.iter().filter(|r| {
            r.status == MaintenanceStatus::Completed && month.contains(r.performed_at)
        })))
    }

    pub async fn total_cost_by_vehicle(&self) -> AppResult<Vec<VehicleCost>> {
        let records = self.records.list().await?;
        Ok(aggregate(
            records.iter().filter(|r| r.status == MaintenanceStatus::Completed),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::maintenance::MaintenanceKind;
    use crate::models::vehicle::VehicleStatus;
    use crate::test_support::{maintenance, Fleet};
    use chrono::TimeZone;
    use rust_decimal::prelude::FromPrimitive;

    #[tokio::test]
    async fn test_schedule_validation() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-02-0001", 30).await;
        let now = Utc::now();

        let err = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(now, now, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(now - Duration::days(30), now, -5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = fleet
            .scheduler
            .schedule(Uuid::new_v4(), maintenance(now - Duration::days(30), now, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_schedule_updates_vehicle_pointer() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-02-0002", 30).await;
        let now = Utc::now();

        let later = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(now - Duration::days(60), now + Duration::days(20), 100))
            .await
            .unwrap();
        let sooner = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(now - Duration::days(60), now + Duration::days(5), 100))
            .await
            .unwrap();
        assert!(sooner.next_due_at > sooner.performed_at);

        let v = fleet.registry.get(vehicle.id).await.unwrap();
        assert_eq!(v.maintenance_history, vec![later.id, sooner.id]);
        assert_eq!(v.next_maintenance.map(|n| n.record_id), Some(sooner.id));

        // No se puede eliminar con mantenimiento programado
        let err = fleet.registry.remove(vehicle.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_classify_partitions_scheduled_records() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-02-0003", 30).await;
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        let performed = now - Duration::days(90);

        let overdue = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(performed, now - Duration::days(1), 10))
            .await
            .unwrap();
        let boundary = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(performed, now, 10))
            .await
            .unwrap();
        let far = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(performed, now + Duration::days(30), 10))
            .await
            .unwrap();
        let near = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(performed, now + Duration::days(3), 10))
            .await
            .unwrap();

        let c = fleet.scheduler.classify(now).await.unwrap();
        let ids = |records: &[MaintenanceRecord]| records.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(&c.overdue), vec![overdue.id, boundary.id]);
        assert_eq!(ids(&c.upcoming), vec![near.id, far.id]);
        assert!(c.history.is_empty());

        let soon = fleet.scheduler.due_within(now, 7).await.unwrap();
        assert_eq!(ids(&soon), vec![near.id]);
    }

    #[tokio::test]
    async fn test_complete_twice_fails_without_side_effects() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-02-0004", 30).await;
        let now = Utc::now();
        let record = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(now - Duration::days(10), now + Duration::days(2), 100))
            .await
            .unwrap();

        let first = fleet
            .scheduler
            .complete(
                record.id,
                CompleteMaintenanceRequest {
                    actual_cost: Decimal::from_i64(150),
                    next_due_at: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(first.status, MaintenanceStatus::Completed);

        let err = fleet
            .scheduler
            .complete(
                record.id,
                CompleteMaintenanceRequest {
                    actual_cost: Decimal::from_i64(999),
                    next_due_at: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fleet.scheduler.get(record.id).await.unwrap(), first);

        let err = fleet
            .scheduler
            .complete(Uuid::new_v4(), CompleteMaintenanceRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let v = fleet.registry.get(vehicle.id).await.unwrap();
        assert_eq!(v.next_maintenance, None);
        fleet.registry.remove(vehicle.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_with_successor() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle("DL-02-0005", 30).await;
        let now = Utc::now();
        let record = fleet
            .scheduler
            .schedule(vehicle.id, maintenance(now - Duration::days(10), now + Duration::days(2), 100))
            .await
            .unwrap();

        let completed = fleet
            .scheduler
            .complete(
                record.id,
                CompleteMaintenanceRequest {
                    actual_cost: None,
                    next_due_at: Some(now + Duration::days(90)),
                },
            )
            .await
            .unwrap();
        let successor_id = completed.successor_id.unwrap();
        assert_eq!(completed.cost, Decimal::from(100));

        let successor = fleet.scheduler.get(successor_id).await.unwrap();
        assert!(successor.is_scheduled());
        assert_eq!(successor.kind, MaintenanceKind::Regular);

        let v = fleet.registry.get(vehicle.id).await.unwrap();
        assert_eq!(v.next_maintenance.map(|n| n.record_id), Some(successor_id));
        assert_eq!(v.maintenance_history, vec![record.id, successor_id]);
        assert_eq!(v.status, VehicleStatus::Active);
    }

    #[tokio::test]
    async fn test_monthly_costs() {
        let fleet = Fleet::new();
        let bus = fleet.vehicle("DL-02-0006", 30).await;
        let van = fleet.vehicle("DL-02-0007", 12).await;
        let march = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let april = Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap();
        let due = Utc::now() + Duration::days(365);

        for (vehicle, performed, cost) in [(bus.id, march, 120), (bus.id, march, 80), (bus.id, april, 50), (van.id, march, 40)] {
            let record = fleet
                .scheduler
                .schedule(vehicle, maintenance(performed, due, cost))
                .await
                .unwrap();
            fleet
                .scheduler
                .complete(record.id, CompleteMaintenanceRequest::default())
                .await
                .unwrap();
        }
        // Programado: no cuenta para costos
        fleet
            .scheduler
            .schedule(bus.id, maintenance(march, due, 1000))
            .await
            .unwrap();

        let month = YearMonth::new(2024, 3).unwrap();
        assert_eq!(fleet.scheduler.monthly_cost(bus.id, month).await.unwrap(), Decimal::from(200));
        assert_eq!(fleet.scheduler.monthly_cost(van.id, month).await.unwrap(), Decimal::from(40));

        let report = fleet.scheduler.monthly_cost_report(month).await.unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].vehicle_id, bus.id);
        assert_eq!(report[0].records, 2);

        let totals = fleet.scheduler.total_cost_by_vehicle().await.unwrap();
        assert_eq!(totals[0].total, Decimal::from(250));

        let history = fleet.scheduler.classify(Utc::now()).await.unwrap().history;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].performed_at, april);
    }
}
