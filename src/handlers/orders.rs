// src/handlers/orders.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{OfficeStaff, RequireRole},
    },
    models::orders::{
        CreateOrderInput, ExtinguisherField, ExtinguisherRecord, LineItemInput, NewExtinguisher, Order, OrderDetail,
        OrderStatus, OrderSummary, PickupOutcome, TransitionOutcome,
    },
};

// ---
// Payloads
// ---

// Campos obrigatórios como Option: a ausência vira ValidationError no serviço.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub client_id: Option<i64>,
    pub pickup_date: Option<NaiveDate>,
    pub requested_count: Option<i32>,
    #[serde(default)]
    pub pickup_address: String,
    #[serde(default)]
    pub pickup_contact: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub notes: String,
    /// Nomes separados por vírgula, ponto e vírgula ou quebra de linha.
    #[schema(example = "Juan Perez, Ana Torres")]
    pub workers: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItemInput>,
}

impl From<CreateOrderPayload> for CreateOrderInput {
    fn from(p: CreateOrderPayload) -> Self {
        Self {
            client_id: p.client_id,
            pickup_date: p.pickup_date,
            requested_count: p.requested_count,
            pickup_address: p.pickup_address,
            pickup_contact: p.pickup_contact,
            contact_phone: p.contact_phone,
            notes: p.notes,
            workers: p.workers,
            line_items: p.line_items,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderPayload {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignWorkersPayload {
    #[serde(default)]
    pub workers: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PickedUpPayload {
    pub picked_up: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RechargeDatePayload {
    #[serde(default)]
    #[schema(example = "2026-03")]
    pub date: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendToReviewPayload {
    pub selected_recharge_date: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCellPayload {
    pub field: ExtinguisherField,
    #[serde(default)]
    pub value: String,
}

// ---
// Leitura
// ---

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    responses(
        (status = 200, description = "Ordens, mais recentes primeiro", body = Vec<OrderSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<OrderSummary>>, AppError> {
    let orders = app_state.order_service.list_orders().await?;
    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    responses(
        (status = 200, description = "Ordem com detalhes e extintores", body = OrderDetail),
        (status = 404, description = "Ordem não encontrada")
    ),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderDetail>, AppError> {
    let detail = app_state.order_service.get_order(order_id).await?;
    Ok(Json(detail))
}

// ---
// Criação e edição
// ---

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Ordem criada (extintores pendentes gerados)", body = OrderDetail),
        (status = 400, description = "Dados obrigatórios ausentes"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!("{} criando ordem", user.username);
    let detail = app_state.order_service.create_order(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    tag = "Orders",
    request_body = UpdateOrderPayload,
    responses((status = 200, description = "Ordem atualizada", body = Order)),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn update_order(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    Json(payload): Json<UpdateOrderPayload>,
) -> Result<Json<Order>, AppError> {
    let order = app_state
        .order_service
        .update_order_info(order_id, payload.status, payload.notes)
        .await?;
    Ok(Json(order))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    tag = "Orders",
    responses(
        (status = 204, description = "Ordem, fotos e extintores removidos"),
        (status = 403, description = "Somente o escritório pode apagar ordens"),
        (status = 404, description = "Ordem não encontrada")
    ),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn delete_order(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(order_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.order_service.delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Etapas
// ---

#[utoipa::path(
    put,
    path = "/api/orders/{id}/workers",
    tag = "Orders",
    request_body = AssignWorkersPayload,
    responses((status = 200, description = "Trabalhadores atribuídos", body = Order)),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn assign_workers(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    Json(payload): Json<AssignWorkersPayload>,
) -> Result<Json<Order>, AppError> {
    let order = app_state
        .order_service
        .assign_workers(order_id, &payload.workers)
        .await?;
    Ok(Json(order))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/confirm-assignment",
    tag = "Orders",
    responses(
        (status = 200, description = "Atribuição confirmada", body = TransitionOutcome),
        (status = 422, description = "Nenhum trabalhador atribuído")
    ),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn confirm_assignment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let outcome = app_state.order_service.confirm_assignment(order_id).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/picked-up",
    tag = "Orders",
    request_body = PickedUpPayload,
    responses((status = 200, description = "Estado de recojo atualizado", body = PickupOutcome)),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn set_picked_up(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    Json(payload): Json<PickedUpPayload>,
) -> Result<Json<PickupOutcome>, AppError> {
    let outcome = app_state
        .order_service
        .set_picked_up(order_id, payload.picked_up)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/recharge-date",
    tag = "Orders",
    request_body = RechargeDatePayload,
    responses(
        (status = 200, description = "Data de recarga salva", body = Order),
        (status = 400, description = "Data em branco")
    ),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn save_recharge_date(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    Json(payload): Json<RechargeDatePayload>,
) -> Result<Json<Order>, AppError> {
    let order = app_state
        .order_service
        .save_recharge_date(order_id, &payload.date)
        .await?;
    Ok(Json(order))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/send-to-review",
    tag = "Orders",
    request_body = SendToReviewPayload,
    responses((status = 200, description = "Ordem enviada ao escritório", body = TransitionOutcome)),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn send_to_review(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    payload: Option<Json<SendToReviewPayload>>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let outcome = app_state
        .order_service
        .send_to_review(order_id, payload.selected_recharge_date)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/finalize",
    tag = "Orders",
    responses(
        (status = 200, description = "Revisão finalizada", body = Order),
        (status = 403, description = "Somente o escritório pode finalizar")
    ),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn finalize_review(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(order_id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    let order = app_state.order_service.finalize_review(order_id).await?;
    Ok(Json(order))
}

// ---
// Planilha de extintores
// ---

#[utoipa::path(
    post,
    path = "/api/orders/{id}/extinguishers",
    tag = "Orders",
    request_body = NewExtinguisher,
    responses((status = 201, description = "Extintor adicionado", body = ExtinguisherRecord)),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn add_extinguisher(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    Json(payload): Json<NewExtinguisher>,
) -> Result<impl IntoResponse, AppError> {
    let record = app_state.order_service.add_extinguisher(order_id, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/extinguishers/{ext_id}",
    tag = "Orders",
    request_body = UpdateCellPayload,
    responses(
        (status = 200, description = "Célula atualizada", body = ExtinguisherRecord),
        (status = 404, description = "Extintor não pertence à ordem")
    ),
    params(
        ("id" = i64, Path, description = "ID da Ordem"),
        ("ext_id" = i64, Path, description = "ID do Extintor")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_extinguisher_cell(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path((order_id, extinguisher_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateCellPayload>,
) -> Result<Json<ExtinguisherRecord>, AppError> {
    let record = app_state
        .order_service
        .update_extinguisher_cell(order_id, extinguisher_id, payload.field, payload.value)
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}/extinguishers/{ext_id}",
    tag = "Orders",
    responses(
        (status = 204, description = "Extintor removido"),
        (status = 404, description = "Extintor não pertence à ordem")
    ),
    params(
        ("id" = i64, Path, description = "ID da Ordem"),
        ("ext_id" = i64, Path, description = "ID do Extintor")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_extinguisher(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path((order_id, extinguisher_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    app_state
        .order_service
        .delete_extinguisher(order_id, extinguisher_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
