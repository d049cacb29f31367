// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::common::error::AppError;

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn active_clients(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE active")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Vencimentos como foram digitados (texto livre na planilha).
    pub async fn recharge_expiries(&self) -> Result<Vec<String>, AppError> {
        let expiries: Vec<String> = sqlx::query_scalar("SELECT recharge_expiry FROM extinguishers")
            .fetch_all(&self.pool)
            .await?;
        Ok(expiries)
    }

    /// Quantidade e soma dos custos das manutenções a partir de `since`.
    pub async fn maintenance_since(&self, since: NaiveDate) -> Result<(i64, Decimal), AppError> {
        let totals: (i64, Decimal) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(cost), 0) FROM maintenance_records WHERE service_date >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }
}
