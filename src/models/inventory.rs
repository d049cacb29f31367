// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- 1. Categorias de peças ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartCategory {
    pub id: i64,
    // Código curto de 3 letras usado como prefixo dos produtos
    #[schema(example = "VAL")]
    pub code: String,
    #[schema(example = "Válvulas")]
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// --- 2. Produtos ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    #[schema(example = "VAL-001")]
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: i64,
    #[schema(example = "unidad")]
    pub unit: String,
    #[schema(value_type = f64)]
    pub stock: Decimal,
    #[schema(value_type = f64)]
    pub min_stock: Decimal,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    pub location: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn needs_restock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub needs_restock: bool,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let needs_restock = product.needs_restock();
        Self { product, needs_restock }
    }
}

// --- 3. Movimentações de Estoque ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "movement_kind", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum MovementKind {
    Entrada, // soma ao estoque
    Salida,  // subtrai do estoque
    Ajuste,  // define o estoque absoluto
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub kind: MovementKind,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[schema(value_type = f64)]
    pub previous_stock: Decimal,
    #[schema(value_type = f64)]
    pub new_stock: Decimal,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_document: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(equal = 3, message = "O código deve ter exatamente 3 caracteres."))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "O nome é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 50, message = "O código é obrigatório."))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "O nome é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: i64,
    #[validate(length(min = 1, max = 50, message = "A unidade é obrigatória."))]
    pub unit: String,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub min_stock: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordMovementPayload {
    pub product_id: i64,
    pub kind: MovementKind,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_document: Option<String>,
}
