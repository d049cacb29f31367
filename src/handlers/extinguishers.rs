// src/handlers/extinguishers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{OfficeStaff, RequireRole},
    },
    models::{
        extinguishers::{CreateExtinguisherPayload, ExtinguisherView, UpdateExtinguisherPayload},
        orders::ExtinguisherRecord,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ExtinguisherFilter {
    /// Só os extintores deste cliente
    pub client_id: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/extinguishers",
    tag = "Extinguishers",
    params(ExtinguisherFilter),
    responses((status = 200, description = "Extintores com o nome do cliente", body = Vec<ExtinguisherView>)),
    security(("api_jwt" = []))
)]
pub async fn list_extinguishers(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(filter): Query<ExtinguisherFilter>,
) -> Result<Json<Vec<ExtinguisherView>>, AppError> {
    Ok(Json(app_state.extinguisher_service.list(filter.client_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/extinguishers/{id}",
    tag = "Extinguishers",
    responses(
        (status = 200, description = "Extintor", body = ExtinguisherView),
        (status = 404, description = "Extintor não encontrado")
    ),
    params(("id" = i64, Path, description = "ID do Extintor")),
    security(("api_jwt" = []))
)]
pub async fn get_extinguisher(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ExtinguisherView>, AppError> {
    Ok(Json(app_state.extinguisher_service.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/extinguishers",
    tag = "Extinguishers",
    request_body = CreateExtinguisherPayload,
    responses(
        (status = 201, description = "Extintor cadastrado", body = ExtinguisherRecord),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_extinguisher(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateExtinguisherPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let record = app_state.extinguisher_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/api/extinguishers/{id}",
    tag = "Extinguishers",
    request_body = UpdateExtinguisherPayload,
    responses(
        (status = 200, description = "Extintor atualizado", body = ExtinguisherRecord),
        (status = 404, description = "Extintor não encontrado"),
        (status = 422, description = "Extintor pertence a uma ordem")
    ),
    params(("id" = i64, Path, description = "ID do Extintor")),
    security(("api_jwt" = []))
)]
pub async fn update_extinguisher(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExtinguisherPayload>,
) -> Result<Json<ExtinguisherRecord>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.extinguisher_service.update(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/extinguishers/{id}",
    tag = "Extinguishers",
    responses(
        (status = 204, description = "Extintor removido"),
        (status = 404, description = "Extintor não encontrado"),
        (status = 422, description = "Extintor pertence a uma ordem")
    ),
    params(("id" = i64, Path, description = "ID do Extintor")),
    security(("api_jwt" = []))
)]
pub async fn delete_extinguisher(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.extinguisher_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
