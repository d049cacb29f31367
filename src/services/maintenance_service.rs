// src/services/maintenance_service.rs

use serde_json::json;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::MaintenanceRepository,
    models::maintenance::{CreateMaintenancePayload, MaintenanceRecord},
    realtime::{EntityChange, NotificationBus},
};

#[derive(Clone)]
pub struct MaintenanceService {
    maintenance_repo: MaintenanceRepository,
    pool: PgPool,
    bus: NotificationBus,
}

impl MaintenanceService {
    pub fn new(maintenance_repo: MaintenanceRepository, pool: PgPool, bus: NotificationBus) -> Self {
        Self {
            maintenance_repo,
            pool,
            bus,
        }
    }

    /// Mais recentes primeiro.
    pub async fn list(&self) -> Result<Vec<MaintenanceRecord>, AppError> {
        self.maintenance_repo.list().await
    }

    pub async fn create(&self, payload: CreateMaintenancePayload) -> Result<MaintenanceRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        if !self
            .maintenance_repo
            .extinguisher_exists(&mut *tx, payload.extinguisher_id)
            .await?
        {
            return Err(AppError::NotFound("Extintor".into()));
        }
        let record = self.maintenance_repo.create(&mut *tx, &payload).await?;
        tx.commit().await?;

        tracing::info!(
            "🔧 Manutenção '{}' registrada para o extintor {}",
            record.service_type,
            record.extinguisher_id
        );
        self.bus.publish_entity(
            "maintenance",
            EntityChange::Created,
            json!({ "id": record.id, "extinguisherId": record.extinguisher_id }),
            Some(format!("Manutenção {} registrada", record.service_type)),
        );
        Ok(record)
    }
}
