// src/handlers/auth.rs

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
    models::auth::{AuthResponse, ChangePasswordPayload, CreateUserPayload, LoginUserPayload, UpdateUserPayload, User},
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login realizado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let token = app_state
        .auth_service
        .login_user(&payload.username, &payload.password)
        .await?;

    Ok(Json(AuthResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = User),
        (status = 403, description = "Somente o escritório cria usuários"),
        (status = 409, description = "Usuário já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = app_state.auth_service.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses((status = 200, description = "Usuário autenticado", body = User)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// ---
// Gestão de usuários (escritório)
// ---

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses((status = 200, description = "Todos os usuários, inclusive desativados", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(app_state.auth_service.list_users().await?))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "Usuário atualizado", body = User),
        (status = 400, description = "Tentativa de desativar o próprio usuário"),
        (status = 404, description = "Usuário não encontrado")
    ),
    params(("id" = i64, Path, description = "ID do Usuário")),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, AppError> {
    payload.validate()?;
    let user = app_state.auth_service.update_user(actor.id, user_id, payload).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    responses(
        (status = 204, description = "Usuário desativado"),
        (status = 400, description = "Tentativa de desativar o próprio usuário"),
        (status = 404, description = "Usuário não encontrado")
    ),
    params(("id" = i64, Path, description = "ID do Usuário")),
    security(("api_jwt" = []))
)]
pub async fn delete_user(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.auth_service.deactivate_user(actor.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/password",
    tag = "Users",
    request_body = ChangePasswordPayload,
    responses(
        (status = 204, description = "Senha alterada"),
        (status = 404, description = "Usuário não encontrado")
    ),
    params(("id" = i64, Path, description = "ID do Usuário")),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    _guard: RequireRole<OfficeStaff>,
    Path(user_id): Path<i64>,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;
    app_state.auth_service.change_password(user_id, payload.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
