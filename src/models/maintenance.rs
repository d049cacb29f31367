// src/models/maintenance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    pub id: i64,
    pub extinguisher_id: i64,
    pub service_date: NaiveDate,
    #[schema(example = "Recarga")]
    pub service_type: String,
    pub technician: String,
    pub notes: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub cost: Option<Decimal>,
    pub next_service: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenancePayload {
    pub extinguisher_id: i64,
    pub service_date: NaiveDate,
    #[validate(length(min = 1, max = 50, message = "O tipo de serviço é obrigatório."))]
    pub service_type: String,
    #[validate(length(min = 1, max = 100, message = "O técnico é obrigatório."))]
    pub technician: String,
    pub notes: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub cost: Option<Decimal>,
    pub next_service: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
}
