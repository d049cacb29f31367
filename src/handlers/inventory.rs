// src/handlers/inventory.rs

use axum::{
    extract::{Query, State},
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
    middleware::auth::AuthenticatedUser,
    models::inventory::{
        CreateCategoryPayload, CreateProductPayload, PartCategory, ProductView, RecordMovementPayload, StockMovement,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct MovementFilter {
    /// Só as movimentações deste produto
    pub product_id: Option<i64>,
}

// ---
// Categorias
// ---

#[utoipa::path(
    get,
    path = "/api/inventory/categories",
    tag = "Inventory",
    responses((status = 200, description = "Categorias de peças", body = Vec<PartCategory>)),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<PartCategory>>, AppError> {
    Ok(Json(app_state.inventory_service.list_categories().await?))
}

#[utoipa::path(
    post,
    path = "/api/inventory/categories",
    tag = "Inventory",
    request_body = CreateCategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = PartCategory),
        (status = 409, description = "Código já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let category = app_state.inventory_service.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

// ---
// Produtos
// ---

#[utoipa::path(
    get,
    path = "/api/inventory/products",
    tag = "Inventory",
    responses((status = 200, description = "Produtos com indicador de reposição", body = Vec<ProductView>)),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<ProductView>>, AppError> {
    Ok(Json(app_state.inventory_service.list_products().await?))
}

#[utoipa::path(
    post,
    path = "/api/inventory/products",
    tag = "Inventory",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = ProductView),
        (status = 409, description = "Código já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let product = app_state.inventory_service.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

// ---
// Movimentações
// ---

#[utoipa::path(
    get,
    path = "/api/inventory/movements",
    tag = "Inventory",
    params(MovementFilter),
    responses((status = 200, description = "Movimentações, mais recentes primeiro", body = Vec<StockMovement>)),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(filter): Query<MovementFilter>,
) -> Result<Json<Vec<StockMovement>>, AppError> {
    Ok(Json(app_state.inventory_service.list_movements(filter.product_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/inventory/movements",
    tag = "Inventory",
    request_body = RecordMovementPayload,
    responses(
        (status = 201, description = "Movimentação registrada", body = StockMovement),
        (status = 404, description = "Produto não encontrado"),
        (status = 422, description = "Estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_movement(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<RecordMovementPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let movement = app_state.inventory_service.record_movement(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}
