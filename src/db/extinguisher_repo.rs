// src/db/extinguisher_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::{
        extinguishers::{CreateExtinguisherPayload, ExtinguisherView},
        orders::ExtinguisherRecord,
    },
};

#[derive(Clone)]
pub struct ExtinguisherRepository {
    pool: PgPool,
}

impl ExtinguisherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, client_id: Option<i64>) -> Result<Vec<ExtinguisherView>, AppError> {
        let extinguishers = sqlx::query_as::<_, ExtinguisherView>(
            r#"
            SELECT e.*, c.name AS client_name
            FROM extinguishers e
            JOIN clients c ON c.id = e.client_id
            WHERE ($1::BIGINT IS NULL OR e.client_id = $1)
            ORDER BY e.id ASC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(extinguishers)
    }

    pub async fn find(&self, id: i64) -> Result<Option<ExtinguisherView>, AppError> {
        let extinguisher = sqlx::query_as::<_, ExtinguisherView>(
            r#"
            SELECT e.*, c.name AS client_name
            FROM extinguishers e
            JOIN clients c ON c.id = e.client_id
            WHERE e.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(extinguisher)
    }

    /// Trava a linha até o fim da transação.
    pub async fn lock<'e, E>(&self, executor: E, id: i64) -> Result<Option<ExtinguisherRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ExtinguisherRecord>("SELECT * FROM extinguishers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(record)
    }

    pub async fn client_is_active<'e, E>(&self, executor: E, client_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1 AND active)")
            .bind(client_id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        payload: &CreateExtinguisherPayload,
    ) -> Result<ExtinguisherRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, ExtinguisherRecord>(
            r#"
            INSERT INTO extinguishers (
                client_id, serial, kind, capacity, brand,
                recharge_date, recharge_expiry, observations, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(payload.client_id)
        .bind(payload.serial.trim())
        .bind(&payload.kind)
        .bind(&payload.capacity)
        .bind(&payload.brand)
        .bind(&payload.recharge_date)
        .bind(&payload.recharge_expiry)
        .bind(&payload.observations)
        .bind(payload.status_or_default())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    pub async fn update<'e, E>(&self, executor: E, record: &ExtinguisherRecord) -> Result<ExtinguisherRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, ExtinguisherRecord>(
            r#"
            UPDATE extinguishers SET
                serial = $2, kind = $3, capacity = $4, brand = $5,
                recharge_date = $6, recharge_expiry = $7, observations = $8, status = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(&record.serial)
        .bind(&record.kind)
        .bind(&record.capacity)
        .bind(&record.brand)
        .bind(&record.recharge_date)
        .bind(&record.recharge_expiry)
        .bind(&record.observations)
        .bind(&record.status)
        .fetch_one(executor)
        .await?;
        Ok(updated)
    }

    // O histórico de manutenção cai junto (ON DELETE CASCADE).
    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM extinguishers WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
