// src/models/clients.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    #[schema(example = "Minera Andina SAC")]
    pub name: String,
    // RUC (identificador fiscal), único entre clientes
    #[schema(example = "20123456789")]
    pub tax_id: String,
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub department: Option<String>,
    pub taxpayer_status: Option<String>,
    pub taxpayer_condition: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    #[validate(length(min = 1, max = 200, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(equal = 11, message = "O RUC deve ter 11 dígitos."))]
    pub tax_id: String,
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub department: Option<String>,
    pub taxpayer_status: Option<String>,
    pub taxpayer_condition: Option<String>,
}
