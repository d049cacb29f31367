// src/models/catalog.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- 1. Tipos de Extintor (PQS, CO2, ...) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtinguisherType {
    pub id: i64,
    #[schema(example = "PQS")]
    pub name: String,
    #[schema(example = "Polvo Químico Seco")]
    pub full_name: String,
    pub fire_class: Option<String>,
    pub description: Option<String>,
    pub color: String,
    pub active: bool,
}

// --- 2. Capacidades ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtinguisherCapacity {
    pub id: i64,
    #[schema(example = "6")]
    pub capacity: String,
    #[schema(example = "kg")]
    pub unit: String,
    pub active: bool,
}

impl ExtinguisherCapacity {
    /// Rótulo copiado para os extintores gerados: "6kg".
    pub fn label(&self) -> String {
        format!("{}{}", self.capacity, self.unit)
    }
}

// --- 3. Marcas ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtinguisherBrand {
    pub id: i64,
    pub name: String,
    pub origin: Option<String>,
    pub active: bool,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTypePayload {
    #[validate(length(min = 1, max = 50, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(min = 1, message = "O nome completo é obrigatório."))]
    pub full_name: String,
    pub fire_class: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCapacityPayload {
    #[validate(length(min = 1, max = 20, message = "A capacidade é obrigatória."))]
    pub capacity: String,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrandPayload {
    #[validate(length(min = 1, max = 50, message = "O nome é obrigatório."))]
    pub name: String,
    pub origin: Option<String>,
}

// Edição: campo ausente mantém o valor atual.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTypePayload {
    #[validate(length(min = 1, max = 50, message = "O nome não pode ficar vazio."))]
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub fire_class: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCapacityPayload {
    #[validate(length(min = 1, max = 20, message = "A capacidade não pode ficar vazia."))]
    pub capacity: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBrandPayload {
    #[validate(length(min = 1, max = 50, message = "O nome não pode ficar vazio."))]
    pub name: Option<String>,
    pub origin: Option<String>,
}
