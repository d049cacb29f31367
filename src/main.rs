//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod realtime;
mod services;
mod storage;

// Importações principais
use crate::config::{AppState, Config};
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Nível vem do RUST_LOG; sem ele, info.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    app_state
        .auth_service
        .ensure_bootstrap_admin(app_state.config.bootstrap_admin_password.as_deref())
        .await?;

    let app = router(app_state.clone());

    // Inicia o servidor
    let listener = TcpListener::bind(&app_state.config.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", app_state.config.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(app_state))
        .await
        .context("Erro no servidor Axum")?;

    tracing::info!("👋 Servidor encerrado");
    Ok(())
}

fn router(app_state: AppState) -> Router {
    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/", get(handlers::auth::list_users).post(handlers::auth::create_user))
        .route("/me", get(handlers::auth::get_me))
        .route(
            "/{id}",
            put(handlers::auth::update_user).delete(handlers::auth::delete_user),
        )
        .route("/{id}/password", post(handlers::auth::change_password));

    let order_routes = Router::new()
        .route(
            "/",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/{id}",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route("/{id}/workers", put(handlers::orders::assign_workers))
        .route("/{id}/confirm-assignment", post(handlers::orders::confirm_assignment))
        .route("/{id}/picked-up", put(handlers::orders::set_picked_up))
        .route("/{id}/recharge-date", put(handlers::orders::save_recharge_date))
        .route("/{id}/send-to-review", post(handlers::orders::send_to_review))
        .route("/{id}/finalize", post(handlers::orders::finalize_review))
        .route("/{id}/extinguishers", post(handlers::orders::add_extinguisher))
        .route(
            "/{id}/extinguishers/{ext_id}",
            patch(handlers::orders::update_extinguisher_cell).delete(handlers::orders::delete_extinguisher),
        );

    // Fotos: limite de corpo próprio para caber foto de celular
    let photo_routes = Router::new()
        .route(
            "/{id}/evidence-photos",
            get(handlers::photos::list_evidence_photos).post(handlers::photos::upload_evidence_photo),
        )
        .route(
            "/{id}/evidence-photos/{photo_id}",
            axum::routing::delete(handlers::photos::delete_evidence_photo),
        )
        .route(
            "/{id}/guide-photos",
            get(handlers::photos::list_guide_photos).post(handlers::photos::upload_guide_photo),
        )
        .route(
            "/{id}/guide-photos/{photo_id}",
            axum::routing::delete(handlers::photos::delete_guide_photo),
        );
    let order_routes = order_routes.merge(handlers::photos::with_upload_limit(
        photo_routes,
        app_state.config.max_upload_bytes,
    ));

    let client_routes = Router::new()
        .route(
            "/",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/{id}",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        );

    let catalog_routes = Router::new()
        .route(
            "/types",
            get(handlers::catalog::list_types).post(handlers::catalog::create_type),
        )
        .route(
            "/types/{id}",
            put(handlers::catalog::update_type).delete(handlers::catalog::delete_type),
        )
        .route(
            "/capacities",
            get(handlers::catalog::list_capacities).post(handlers::catalog::create_capacity),
        )
        .route(
            "/capacities/{id}",
            put(handlers::catalog::update_capacity).delete(handlers::catalog::delete_capacity),
        )
        .route(
            "/brands",
            get(handlers::catalog::list_brands).post(handlers::catalog::create_brand),
        )
        .route(
            "/brands/{id}",
            put(handlers::catalog::update_brand).delete(handlers::catalog::delete_brand),
        );

    let extinguisher_routes = Router::new()
        .route(
            "/",
            get(handlers::extinguishers::list_extinguishers).post(handlers::extinguishers::create_extinguisher),
        )
        .route(
            "/{id}",
            get(handlers::extinguishers::get_extinguisher)
                .put(handlers::extinguishers::update_extinguisher)
                .delete(handlers::extinguishers::delete_extinguisher),
        );

    let inventory_routes = Router::new()
        .route(
            "/categories",
            get(handlers::inventory::list_categories).post(handlers::inventory::create_category),
        )
        .route(
            "/products",
            get(handlers::inventory::list_products).post(handlers::inventory::create_product),
        )
        .route(
            "/movements",
            get(handlers::inventory::list_movements).post(handlers::inventory::record_movement),
        );

    // Tudo abaixo exige token válido
    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/orders", order_routes)
        .nest("/clients", client_routes)
        .nest("/catalog", catalog_routes)
        .nest("/extinguishers", extinguisher_routes)
        .route("/dashboard", get(handlers::dashboard::summary))
        .route(
            "/maintenance",
            get(handlers::maintenance::list_maintenance).post(handlers::maintenance::create_maintenance),
        )
        .nest("/inventory", inventory_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/auth", auth_routes)
        .merge(protected);

    // Combina tudo no router principal
    Router::new()
        .nest("/api", api)
        // O WebSocket valida o token da query antes do upgrade
        .route("/ws", get(realtime::socket::ws_handler))
        .route("/api-docs/openapi.json", get(|| async { Json(docs::ApiDoc::openapi()) }))
        // Fotos enviadas ficam públicas, só leitura: o front as abre por link direto (<img src>)
        .nest_service("/static", ServeDir::new(&app_state.config.upload_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn shutdown_signal(app_state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("🔥 Falha ao escutar Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Encerrando: limpando presença ({} conectados)", app_state.presence.online_count().await);
    app_state.presence.clear().await;
}
