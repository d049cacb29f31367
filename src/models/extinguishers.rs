// src/models/extinguishers.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::orders::ExtinguisherRecord;

/// Extintor com o nome do cliente, para a listagem geral.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtinguisherView {
    pub id: i64,
    pub client_id: i64,
    pub client_name: String,
    pub order_id: Option<i64>,
    pub serial: String,
    pub kind: String,
    pub capacity: String,
    pub brand: String,
    pub recharge_date: String,
    pub recharge_expiry: String,
    pub observations: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExtinguisherPayload {
    pub client_id: i64,
    #[serde(default)]
    #[validate(length(max = 100, message = "Série longa demais."))]
    pub serial: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub capacity: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub recharge_date: String,
    #[serde(default)]
    pub recharge_expiry: String,
    #[serde(default)]
    pub observations: String,
    #[schema(example = "Pendiente")]
    pub status: Option<String>,
}

impl CreateExtinguisherPayload {
    pub fn status_or_default(&self) -> &str {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EXTINGUISHER_STATUS)
    }
}

pub const DEFAULT_EXTINGUISHER_STATUS: &str = "Pendiente";

// Campo ausente mantém o valor atual.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExtinguisherPayload {
    #[validate(length(max = 100, message = "Série longa demais."))]
    pub serial: Option<String>,
    pub kind: Option<String>,
    pub capacity: Option<String>,
    pub brand: Option<String>,
    pub recharge_date: Option<String>,
    pub recharge_expiry: Option<String>,
    pub observations: Option<String>,
    #[validate(length(min = 1, max = 50, message = "O estado não pode ficar vazio."))]
    pub status: Option<String>,
}

impl UpdateExtinguisherPayload {
    pub fn apply(self, record: &mut ExtinguisherRecord) {
        if let Some(serial) = self.serial {
            record.serial = serial.trim().to_string();
        }
        if let Some(kind) = self.kind {
            record.kind = kind;
        }
        if let Some(capacity) = self.capacity {
            record.capacity = capacity;
        }
        if let Some(brand) = self.brand {
            record.brand = brand;
        }
        if let Some(date) = self.recharge_date {
            record.recharge_date = date;
        }
        if let Some(expiry) = self.recharge_expiry {
            record.recharge_expiry = expiry;
        }
        if let Some(observations) = self.observations {
            record.observations = observations;
        }
        if let Some(status) = self.status {
            record.status = status.trim().to_string();
        }
    }
}
