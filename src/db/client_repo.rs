// src/db/client_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::clients::{Client, ClientPayload},
};

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE active ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &ClientPayload) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                name, tax_id, address, district, province, department,
                taxpayer_status, taxpayer_condition
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&payload.name)
        .bind(&payload.tax_id)
        .bind(&payload.address)
        .bind(&payload.district)
        .bind(&payload.province)
        .bind(&payload.department)
        .bind(&payload.taxpayer_status)
        .bind(&payload.taxpayer_condition)
        .fetch_one(executor)
        .await?;
        Ok(client)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: i64,
        payload: &ClientPayload,
    ) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET
                name = $2, tax_id = $3, address = $4, district = $5, province = $6,
                department = $7, taxpayer_status = $8, taxpayer_condition = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.tax_id)
        .bind(&payload.address)
        .bind(&payload.district)
        .bind(&payload.province)
        .bind(&payload.department)
        .bind(&payload.taxpayer_status)
        .bind(&payload.taxpayer_condition)
        .fetch_optional(executor)
        .await?;
        Ok(client)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
