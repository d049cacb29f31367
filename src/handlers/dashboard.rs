// src/handlers/dashboard.rs

use axum::{extract::State, Json};

use crate::{
    common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser,
    models::dashboard::DashboardSummary,
};

#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses((status = 200, description = "Indicadores do painel", body = DashboardSummary)),
    security(("api_jwt" = []))
)]
pub async fn summary(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<DashboardSummary>, AppError> {
    Ok(Json(app_state.dashboard_service.summary().await?))
}
