// src/handlers/catalog.rs

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
    db::CatalogTable,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{OfficeStaff, RequireRole},
    },
    models::catalog::{
        CreateBrandPayload, CreateCapacityPayload, CreateTypePayload, ExtinguisherBrand, ExtinguisherCapacity,
        ExtinguisherType, UpdateBrandPayload, UpdateCapacityPayload, UpdateTypePayload,
    },
};

// ---
// Tipos
// ---

#[utoipa::path(
    get,
    path = "/api/catalog/types",
    tag = "Catalog",
    responses((status = 200, description = "Tipos ativos", body = Vec<ExtinguisherType>)),
    security(("api_jwt" = []))
)]
pub async fn list_types(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<ExtinguisherType>>, AppError> {
    Ok(Json(app_state.catalog_service.list_types().await?))
}

#[utoipa::path(
    post,
    path = "/api/catalog/types",
    tag = "Catalog",
    request_body = CreateTypePayload,
    responses(
        (status = 201, description = "Tipo criado", body = ExtinguisherType),
        (status = 409, description = "Tipo já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_type(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateTypePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let created = app_state.catalog_service.create_type(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/types/{id}",
    tag = "Catalog",
    request_body = UpdateTypePayload,
    responses(
        (status = 200, description = "Tipo atualizado", body = ExtinguisherType),
        (status = 404, description = "Tipo não encontrado"),
        (status = 409, description = "Nome já usado")
    ),
    params(("id" = i64, Path, description = "ID do Tipo")),
    security(("api_jwt" = []))
)]
pub async fn update_type(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTypePayload>,
) -> Result<Json<ExtinguisherType>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.catalog_service.update_type(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/types/{id}",
    tag = "Catalog",
    responses((status = 204, description = "Tipo removido"), (status = 404, description = "Tipo não encontrado")),
    params(("id" = i64, Path, description = "ID do Tipo")),
    security(("api_jwt" = []))
)]
pub async fn delete_type(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.catalog_service.delete(CatalogTable::Types, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Capacidades
// ---

#[utoipa::path(
    get,
    path = "/api/catalog/capacities",
    tag = "Catalog",
    responses((status = 200, description = "Capacidades ativas", body = Vec<ExtinguisherCapacity>)),
    security(("api_jwt" = []))
)]
pub async fn list_capacities(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<ExtinguisherCapacity>>, AppError> {
    Ok(Json(app_state.catalog_service.list_capacities().await?))
}

#[utoipa::path(
    post,
    path = "/api/catalog/capacities",
    tag = "Catalog",
    request_body = CreateCapacityPayload,
    responses((status = 201, description = "Capacidade criada", body = ExtinguisherCapacity)),
    security(("api_jwt" = []))
)]
pub async fn create_capacity(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateCapacityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let created = app_state.catalog_service.create_capacity(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/capacities/{id}",
    tag = "Catalog",
    request_body = UpdateCapacityPayload,
    responses(
        (status = 200, description = "Capacidade atualizado", body = ExtinguisherCapacity),
        (status = 404, description = "Capacidade não encontrado"),
        (status = 409, description = "Nome já usado")
    ),
    params(("id" = i64, Path, description = "ID do Capacidade")),
    security(("api_jwt" = []))
)]
pub async fn update_capacity(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCapacityPayload>,
) -> Result<Json<ExtinguisherCapacity>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.catalog_service.update_capacity(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/capacities/{id}",
    tag = "Catalog",
    responses(
        (status = 204, description = "Capacidade removida"),
        (status = 404, description = "Capacidade não encontrada")
    ),
    params(("id" = i64, Path, description = "ID da Capacidade")),
    security(("api_jwt" = []))
)]
pub async fn delete_capacity(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.catalog_service.delete(CatalogTable::Capacities, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Marcas
// ---

#[utoipa::path(
    get,
    path = "/api/catalog/brands",
    tag = "Catalog",
    responses((status = 200, description = "Marcas ativas", body = Vec<ExtinguisherBrand>)),
    security(("api_jwt" = []))
)]
pub async fn list_brands(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<ExtinguisherBrand>>, AppError> {
    Ok(Json(app_state.catalog_service.list_brands().await?))
}

#[utoipa::path(
    post,
    path = "/api/catalog/brands",
    tag = "Catalog",
    request_body = CreateBrandPayload,
    responses((status = 201, description = "Marca criada", body = ExtinguisherBrand)),
    security(("api_jwt" = []))
)]
pub async fn create_brand(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateBrandPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let created = app_state.catalog_service.create_brand(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/brands/{id}",
    tag = "Catalog",
    request_body = UpdateBrandPayload,
    responses(
        (status = 200, description = "Marca atualizado", body = ExtinguisherBrand),
        (status = 404, description = "Marca não encontrado"),
        (status = 409, description = "Nome já usado")
    ),
    params(("id" = i64, Path, description = "ID do Marca")),
    security(("api_jwt" = []))
)]
pub async fn update_brand(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBrandPayload>,
) -> Result<Json<ExtinguisherBrand>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.catalog_service.update_brand(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/brands/{id}",
    tag = "Catalog",
    responses((status = 204, description = "Marca removida"), (status = 404, description = "Marca não encontrada")),
    params(("id" = i64, Path, description = "ID da Marca")),
    security(("api_jwt" = []))
)]
pub async fn delete_brand(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.catalog_service.delete(CatalogTable::Brands, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
