// src/handlers/clients.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{OfficeStaff, RequireRole},
    },
    models::clients::{Client, ClientPayload},
};

#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    responses((status = 200, description = "Clientes ativos", body = Vec<Client>)),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Client>>, AppError> {
    Ok(Json(app_state.client_service.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "Clients",
    responses(
        (status = 200, description = "Cliente", body = Client),
        (status = 404, description = "Cliente não encontrado")
    ),
    params(("id" = i64, Path, description = "ID do Cliente")),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(client_id): Path<i64>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(app_state.client_service.get(client_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clients",
    request_body = ClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Client),
        (status = 409, description = "RUC já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let client = app_state.client_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    tag = "Clients",
    request_body = ClientPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = Client),
        (status = 404, description = "Cliente não encontrado"),
        (status = 409, description = "RUC já cadastrado")
    ),
    params(("id" = i64, Path, description = "ID do Cliente")),
    security(("api_jwt" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(client_id): Path<i64>,
    Json(payload): Json<ClientPayload>,
) -> Result<Json<Client>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.client_service.update(client_id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "Clients",
    responses(
        (status = 204, description = "Cliente removido"),
        (status = 403, description = "Somente o escritório apaga clientes"),
        (status = 404, description = "Cliente não encontrado")
    ),
    params(("id" = i64, Path, description = "ID do Cliente")),
    security(("api_jwt" = []))
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(client_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.client_service.delete(client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
