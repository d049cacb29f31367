// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Só clientes ativos
    pub total_clients: i64,
    pub total_extinguishers: i64,
    /// Vencimento de recarga nos próximos 30 dias
    pub expiring_soon: i64,
    pub expired: i64,
    pub maintenance_this_month: i64,
    #[schema(value_type = f64)]
    pub income_this_month: Decimal,
}
