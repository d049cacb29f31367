// src/models/orders.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Enums ---

/// Etapa da ordem no fluxo recojo → revisão → finalização.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_stage", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStage {
    Creada,
    Asignada,
    Recogido,
    Revision,
    Finalizado,
}

impl OrderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStage::Creada => "CREADA",
            OrderStage::Asignada => "ASIGNADA",
            OrderStage::Recogido => "RECOGIDO",
            OrderStage::Revision => "REVISION",
            OrderStage::Finalizado => "FINALIZADO",
        }
    }
}

// Rótulo "grosso" e informativo. Não acompanha a etapa de forma estrita.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
    #[sqlx(rename = "Pendiente")]
    #[serde(rename = "Pendiente")]
    Pending,
    #[sqlx(rename = "En Proceso")]
    #[serde(rename = "En Proceso")]
    InProgress,
    #[sqlx(rename = "Completada")]
    #[serde(rename = "Completada")]
    Completed,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pendiente",
            OrderStatus::InProgress => "En Proceso",
            OrderStatus::Completed => "Completada",
        }
    }
}

// --- Ordem de Trabalho ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[schema(example = 12)]
    pub id: i64,
    #[schema(example = "OT-00012")]
    pub order_number: String,
    pub client_id: i64,
    pub pickup_date: NaiveDate,
    #[schema(example = 2)]
    pub requested_count: i32,
    pub pickup_address: String,
    pub pickup_contact: String,
    pub contact_phone: String,
    pub notes: String,
    pub status: OrderStatus,
    pub stage: OrderStage,
    #[schema(example = json!(["Juan Perez"]))]
    pub assigned_workers: Vec<String>,
    pub picked_up: bool,
    pub picked_up_on: Option<NaiveDate>,
    pub worker_completed_at: Option<DateTime<Utc>>,
    pub office_reviewed_at: Option<DateTime<Utc>>,
    pub selected_recharge_date: Option<String>,

    // Indicadores permanentes: uma vez `true`, nunca voltam a `false`.
    pub sent_to_office: bool,
    pub sent_to_office_at: Option<DateTime<Utc>>,
    pub ever_marked_picked_up: bool,
    pub ever_assignment_confirmed: bool,

    // Desmarcado sempre que uma etapa anterior muda depois da revisão.
    pub review_finalized: bool,

    // Derivados da contagem de fotos; nunca atribuídos diretamente por quem chama.
    pub has_photo_evidence: bool,
    pub has_pickup_guide_photo: bool,

    pub created_at: DateTime<Utc>,
}

/// Dados da ordem antes de existir um `id` no banco.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub client_id: i64,
    pub pickup_date: NaiveDate,
    pub requested_count: i32,
    pub pickup_address: String,
    pub pickup_contact: String,
    pub contact_phone: String,
    pub notes: String,
    pub status: OrderStatus,
    pub stage: OrderStage,
    pub assigned_workers: Vec<String>,
    pub ever_assignment_confirmed: bool,
}

// Resumo tipo/capacidade/quantidade usado para regerar os extintores pendentes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDetail {
    pub id: i64,
    pub order_id: i64,
    pub type_id: i64,
    pub capacity_id: i64,
    #[schema(example = 2)]
    pub quantity: i32,
}

// --- Extintores da ordem ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtinguisherRecord {
    pub id: i64,
    pub client_id: i64,
    pub order_id: Option<i64>,
    #[schema(example = "A-10293")]
    pub serial: String,
    #[schema(example = "PQS")]
    pub kind: String,
    #[schema(example = "6kg")]
    pub capacity: String,
    pub brand: String,
    pub recharge_date: String,
    pub recharge_expiry: String,
    pub observations: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl ExtinguisherRecord {
    /// Um extintor está "registrado" quando o técnico já preencheu a série.
    pub fn is_registered(&self) -> bool {
        !self.serial.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewExtinguisher {
    #[serde(default)]
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
}

/// Campos editáveis célula a célula na planilha compartilhada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtinguisherField {
    Serial,
    Kind,
    Capacity,
    Brand,
    RechargeDate,
    RechargeExpiry,
    Observations,
}

impl ExtinguisherField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtinguisherField::Serial => "serial",
            ExtinguisherField::Kind => "kind",
            ExtinguisherField::Capacity => "capacity",
            ExtinguisherField::Brand => "brand",
            ExtinguisherField::RechargeDate => "recharge_date",
            ExtinguisherField::RechargeExpiry => "recharge_expiry",
            ExtinguisherField::Observations => "observations",
        }
    }

    pub fn apply(&self, record: &mut ExtinguisherRecord, value: String) {
        match self {
            ExtinguisherField::Serial => record.serial = value,
            ExtinguisherField::Kind => record.kind = value,
            ExtinguisherField::Capacity => record.capacity = value,
            ExtinguisherField::Brand => record.brand = value,
            ExtinguisherField::RechargeDate => record.recharge_date = value,
            ExtinguisherField::RechargeExpiry => record.recharge_expiry = value,
            ExtinguisherField::Observations => record.observations = value,
        }
    }
}

// --- Entradas/Saídas do motor ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub type_id: i64,
    pub capacity_id: i64,
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub client_id: Option<i64>,
    pub pickup_date: Option<NaiveDate>,
    pub requested_count: Option<i32>,
    pub pickup_address: String,
    pub pickup_contact: String,
    pub contact_phone: String,
    pub notes: String,
    pub workers: Option<String>,
    pub line_items: Vec<LineItemInput>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub registered_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub line_details: Vec<OrderLineDetail>,
    pub extinguishers: Vec<ExtinguisherRecord>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub stage: OrderStage,
    pub is_first_time: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PickupOutcome {
    pub picked_up: bool,
    pub stage: OrderStage,
    pub is_first_time: bool,
    pub generated: usize,
    pub removed: u64,
    pub total_extinguishers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Os rótulos dos logs e eventos são os mesmos nomes do JSON.
    #[test]
    fn log_labels_match_the_wire_names() {
        for stage in [
            OrderStage::Creada,
            OrderStage::Asignada,
            OrderStage::Recogido,
            OrderStage::Revision,
            OrderStage::Finalizado,
        ] {
            assert_eq!(serde_json::to_value(stage).unwrap(), json!(stage.as_str()));
        }
        for status in [OrderStatus::Pending, OrderStatus::InProgress, OrderStatus::Completed] {
            assert_eq!(serde_json::to_value(status).unwrap(), json!(status.label()));
        }
        for field in [ExtinguisherField::Serial, ExtinguisherField::RechargeExpiry] {
            assert_eq!(serde_json::to_value(field).unwrap(), json!(field.as_str()));
        }
    }
}
