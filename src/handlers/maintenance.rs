// src/handlers/maintenance.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::maintenance::{CreateMaintenancePayload, MaintenanceRecord},
};

#[utoipa::path(
    get,
    path = "/api/maintenance",
    tag = "Maintenance",
    responses((status = 200, description = "Manutenções, mais recentes primeiro", body = Vec<MaintenanceRecord>)),
    security(("api_jwt" = []))
)]
pub async fn list_maintenance(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<MaintenanceRecord>>, AppError> {
    Ok(Json(app_state.maintenance_service.list().await?))
}

#[utoipa::path(
    post,
    path = "/api/maintenance",
    tag = "Maintenance",
    request_body = CreateMaintenancePayload,
    responses(
        (status = 201, description = "Manutenção registrada", body = MaintenanceRecord),
        (status = 404, description = "Extintor não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_maintenance(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateMaintenancePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let record = app_state.maintenance_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
