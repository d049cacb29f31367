// src/handlers/photos.rs

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json, Router,
};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::photos::{Photo, PhotoKind},
};

/// Campo do formulário multipart que carrega o arquivo.
pub const PHOTO_FIELD: &str = "photo";

// Só para a documentação do corpo multipart.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PhotoUpload {
    #[schema(value_type = String, format = Binary)]
    pub photo: Vec<u8>,
}

/// Troca o limite padrão do axum (2 MB) pelo configurado nas rotas de upload.
pub fn with_upload_limit<S>(routes: Router<S>, max_bytes: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes.layer(DefaultBodyLimit::max(max_bytes))
}

fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::ValidationError(format!("{}: {}", context, e.body_text()))
    }
}

async fn read_photo_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Formulário inválido", e))?
    {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Falha ao ler o arquivo", e))?;
        if bytes.is_empty() {
            return Err(AppError::ValidationError("O arquivo está vazio".into()));
        }
        return Ok((filename, bytes.to_vec()));
    }
    Err(AppError::ValidationError(format!(
        "Nenhum arquivo no campo '{}'",
        PHOTO_FIELD
    )))
}

async fn upload(app_state: AppState, order_id: i64, kind: PhotoKind, multipart: Multipart) -> Result<Photo, AppError> {
    let (filename, bytes) = read_photo_field(multipart).await?;
    app_state
        .evidence_service
        .attach(order_id, kind, &bytes, &filename)
        .await
}

// ---
// Fotos de recojo (evidência)
// ---

#[utoipa::path(
    get,
    path = "/api/orders/{id}/evidence-photos",
    tag = "Photos",
    responses((status = 200, description = "Fotos de recojo, mais recentes primeiro", body = Vec<Photo>)),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn list_evidence_photos(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> Result<Json<Vec<Photo>>, AppError> {
    let photos = app_state.evidence_service.list(order_id, PhotoKind::Evidence).await?;
    Ok(Json(photos))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/evidence-photos",
    tag = "Photos",
    request_body(content = PhotoUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Foto anexada", body = Photo),
        (status = 404, description = "Ordem não encontrada"),
        (status = 415, description = "Extensão não permitida")
    ),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn upload_evidence_photo(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let photo = upload(app_state, order_id, PhotoKind::Evidence, multipart).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}/evidence-photos/{photo_id}",
    tag = "Photos",
    responses(
        (status = 204, description = "Foto removida"),
        (status = 404, description = "Foto não pertence à ordem")
    ),
    params(
        ("id" = i64, Path, description = "ID da Ordem"),
        ("photo_id" = i64, Path, description = "ID da Foto")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_evidence_photo(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path((order_id, photo_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    app_state
        .evidence_service
        .delete(order_id, photo_id, PhotoKind::Evidence)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Fotos da guia de recojo
// ---

#[utoipa::path(
    get,
    path = "/api/orders/{id}/guide-photos",
    tag = "Photos",
    responses((status = 200, description = "Fotos da guia, mais recentes primeiro", body = Vec<Photo>)),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn list_guide_photos(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> Result<Json<Vec<Photo>>, AppError> {
    let photos = app_state.evidence_service.list(order_id, PhotoKind::Guide).await?;
    Ok(Json(photos))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/guide-photos",
    tag = "Photos",
    request_body(content = PhotoUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Foto da guia anexada", body = Photo),
        (status = 404, description = "Ordem não encontrada"),
        (status = 415, description = "Extensão não permitida")
    ),
    params(("id" = i64, Path, description = "ID da Ordem")),
    security(("api_jwt" = []))
)]
pub async fn upload_guide_photo(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(order_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let photo = upload(app_state, order_id, PhotoKind::Guide, multipart).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}/guide-photos/{photo_id}",
    tag = "Photos",
    responses(
        (status = 204, description = "Foto da guia removida"),
        (status = 404, description = "Foto não pertence à ordem")
    ),
    params(
        ("id" = i64, Path, description = "ID da Ordem"),
        ("photo_id" = i64, Path, description = "ID da Foto")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_guide_photo(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path((order_id, photo_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    app_state
        .evidence_service
        .delete(order_id, photo_id, PhotoKind::Guide)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{header, Request}, routing::post};
    use tower::ServiceExt;

    const BOUNDARY: &str = "extintores-boundary";

    fn photo_request(size: usize) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{PHOTO_FIELD}\"; filename=\"foto.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .into_bytes();
        body.extend(std::iter::repeat_n(0xAB_u8, size));
        body.extend(format!("\r\n--{BOUNDARY}--\r\n").into_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn upload_router(max_bytes: usize) -> Router {
        let routes = Router::new().route(
            "/upload",
            post(|multipart: Multipart| async move {
                let (filename, bytes) = read_photo_field(multipart).await?;
                Ok::<_, AppError>(format!("{} {}", filename, bytes.len()))
            }),
        );
        with_upload_limit(routes, max_bytes)
    }

    #[tokio::test]
    async fn phone_sized_photos_fit_under_the_configured_limit() {
        let response = upload_router(crate::config::DEFAULT_MAX_UPLOAD_BYTES)
            .oneshot(photo_request(5 * 1024 * 1024))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_uploads_are_payload_too_large() {
        let response = upload_router(64 * 1024)
            .oneshot(photo_request(128 * 1024))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
