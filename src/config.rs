// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::{
    db::{
        CatalogRepository, ClientRepository, DashboardRepository, ExtinguisherRepository, InventoryRepository,
        MaintenanceRepository, PgRecordStore, UserRepository,
    },
    realtime::{NotificationBus, PresenceTracker},
    services::{
        auth::AuthService, catalog_service::CatalogService, client_service::ClientService,
        dashboard_service::DashboardService, evidence_service::EvidenceService,
        extinguisher_service::ExtinguisherService, inventory_service::InventoryService,
        maintenance_service::MaintenanceService, order_service::OrderService,
    },
    storage::LocalBlobStore,
};

// --- Configuração lida do ambiente ---

/// Limite do corpo dos uploads de fotos (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub upload_dir: String,
    pub db_max_connections: u32,
    pub event_bus_capacity: usize,
    pub order_number_retries: u32,
    pub max_upload_bytes: usize,
    pub bootstrap_admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Separado de `from_env` para os testes não mexerem no ambiente do processo.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{} deve ser definida", key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:3000"),
            upload_dir: or_default("UPLOAD_DIR", "static"),
            db_max_connections: parse_number(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            event_bus_capacity: parse_number(&lookup, "EVENT_BUS_CAPACITY", 256)?,
            order_number_retries: parse_number(&lookup, "ORDER_NUMBER_RETRIES", 5)?,
            max_upload_bytes: parse_number(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            bootstrap_admin_password: lookup("BOOTSTRAP_ADMIN_PASSWORD").filter(|p| !p.is_empty()),
        })
    }
}

fn parse_number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválido: '{}'", key, raw)),
        None => Ok(default),
    }
}

// --- Estado compartilhado ---

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: PgPool,
    pub bus: NotificationBus,
    pub presence: Arc<PresenceTracker>,
    pub auth_service: AuthService,
    pub order_service: OrderService,
    pub evidence_service: EvidenceService,
    pub client_service: ClientService,
    pub catalog_service: CatalogService,
    pub maintenance_service: MaintenanceService,
    pub inventory_service: InventoryService,
    pub extinguisher_service: ExtinguisherService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let bus = NotificationBus::new(config.event_bus_capacity);
        let presence = Arc::new(PresenceTracker::new(bus.clone()));

        let store = Arc::new(PgRecordStore::new(db_pool.clone()));
        let blobs = Arc::new(LocalBlobStore::new(&config.upload_dir));

        let auth_service = AuthService::new(
            UserRepository::new(db_pool.clone()),
            config.jwt_secret.clone(),
            db_pool.clone(),
            bus.clone(),
        );
        let order_service = OrderService::new(
            store.clone(),
            blobs.clone(),
            bus.clone(),
            config.order_number_retries,
        );
        let evidence_service = EvidenceService::new(store, blobs, bus.clone());
        let client_service = ClientService::new(ClientRepository::new(db_pool.clone()), db_pool.clone(), bus.clone());
        let catalog_service =
            CatalogService::new(CatalogRepository::new(db_pool.clone()), db_pool.clone(), bus.clone());
        let maintenance_service =
            MaintenanceService::new(MaintenanceRepository::new(db_pool.clone()), db_pool.clone(), bus.clone());
        let inventory_service =
            InventoryService::new(InventoryRepository::new(db_pool.clone()), db_pool.clone(), bus.clone());
        let extinguisher_service =
            ExtinguisherService::new(ExtinguisherRepository::new(db_pool.clone()), db_pool.clone(), bus.clone());
        let dashboard_service = DashboardService::new(DashboardRepository::new(db_pool.clone()));

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            bus,
            presence,
            auth_service,
            order_service,
            evidence_service,
            client_service,
            catalog_service,
            maintenance_service,
            inventory_service,
            extinguisher_service,
            dashboard_service,
        })
    }
}
