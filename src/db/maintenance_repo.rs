// src/db/maintenance_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::maintenance::{CreateMaintenancePayload, MaintenanceRecord},
};

#[derive(Clone)]
pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<MaintenanceRecord>, AppError> {
        let records = sqlx::query_as::<_, MaintenanceRecord>(
            "SELECT * FROM maintenance_records ORDER BY service_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn extinguisher_exists<'e, E>(&self, executor: E, extinguisher_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM extinguishers WHERE id = $1)")
            .bind(extinguisher_id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        payload: &CreateMaintenancePayload,
    ) -> Result<MaintenanceRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            INSERT INTO maintenance_records (
                extinguisher_id, service_date, service_type, technician,
                notes, cost, next_service, completed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(payload.extinguisher_id)
        .bind(payload.service_date)
        .bind(&payload.service_type)
        .bind(&payload.technician)
        .bind(&payload.notes)
        .bind(payload.cost)
        .bind(payload.next_service)
        .bind(payload.completed)
        .fetch_one(executor)
        .await?;
        Ok(record)
    }
}
