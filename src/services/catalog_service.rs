// src/services/catalog_service.rs

use serde_json::json;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, CatalogTable},
    models::catalog::{
        CreateBrandPayload, CreateCapacityPayload, CreateTypePayload, ExtinguisherBrand, ExtinguisherCapacity,
        ExtinguisherType, UpdateBrandPayload, UpdateCapacityPayload, UpdateTypePayload,
    },
    realtime::{EntityChange, NotificationBus},
};

const DEFAULT_TYPE_COLOR: &str = "#6c757d";
const DEFAULT_UNIT: &str = "kg";

fn display_name(table: CatalogTable) -> &'static str {
    match table {
        CatalogTable::Types => "Tipo de extintor",
        CatalogTable::Capacities => "Capacidade",
        CatalogTable::Brands => "Marca",
    }
}

// "pqs " e "PQS" são o mesmo tipo.
fn normalize_type_name(name: &str) -> String {
    name.trim().to_uppercase()
}

#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
    pool: PgPool,
    bus: NotificationBus,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository, pool: PgPool, bus: NotificationBus) -> Self {
        Self { catalog_repo, pool, bus }
    }

    // --- Leitura (só ativos) ---

    pub async fn list_types(&self) -> Result<Vec<ExtinguisherType>, AppError> {
        self.catalog_repo.list_types().await
    }

    pub async fn list_capacities(&self) -> Result<Vec<ExtinguisherCapacity>, AppError> {
        self.catalog_repo.list_capacities().await
    }

    pub async fn list_brands(&self) -> Result<Vec<ExtinguisherBrand>, AppError> {
        self.catalog_repo.list_brands().await
    }

    // --- Escrita ---

    pub async fn create_type(&self, payload: CreateTypePayload) -> Result<ExtinguisherType, AppError> {
        let name = normalize_type_name(&payload.name);
        let created = self
            .catalog_repo
            .create_type(
                &self.pool,
                &name,
                payload.full_name.trim(),
                payload.fire_class.as_deref(),
                payload.description.as_deref(),
                payload.color.as_deref().unwrap_or(DEFAULT_TYPE_COLOR),
            )
            .await?;

        self.announce(CatalogTable::Types, EntityChange::Created, created.id, &created.name);
        Ok(created)
    }

    pub async fn create_capacity(&self, payload: CreateCapacityPayload) -> Result<ExtinguisherCapacity, AppError> {
        let unit = payload
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT);
        let created = self
            .catalog_repo
            .create_capacity(&self.pool, payload.capacity.trim(), unit)
            .await?;

        self.announce(CatalogTable::Capacities, EntityChange::Created, created.id, &created.label());
        Ok(created)
    }

    pub async fn create_brand(&self, payload: CreateBrandPayload) -> Result<ExtinguisherBrand, AppError> {
        let created = self
            .catalog_repo
            .create_brand(&self.pool, payload.name.trim(), payload.origin.as_deref())
            .await?;

        self.announce(CatalogTable::Brands, EntityChange::Created, created.id, &created.name);
        Ok(created)
    }

    pub async fn update_type(&self, id: i64, mut payload: UpdateTypePayload) -> Result<ExtinguisherType, AppError> {
        payload.name = payload.name.as_deref().map(normalize_type_name);
        payload.full_name = payload.full_name.map(|n| n.trim().to_string());
        let updated = self
            .catalog_repo
            .update_type(&self.pool, id, &payload)
            .await?
            .ok_or_else(|| AppError::NotFound(display_name(CatalogTable::Types).into()))?;

        self.announce(CatalogTable::Types, EntityChange::Updated, updated.id, &updated.name);
        Ok(updated)
    }

    pub async fn update_capacity(
        &self,
        id: i64,
        payload: UpdateCapacityPayload,
    ) -> Result<ExtinguisherCapacity, AppError> {
        let unit = payload.unit.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let updated = self
            .catalog_repo
            .update_capacity(&self.pool, id, payload.capacity.as_deref().map(str::trim), unit)
            .await?
            .ok_or_else(|| AppError::NotFound(display_name(CatalogTable::Capacities).into()))?;

        self.announce(CatalogTable::Capacities, EntityChange::Updated, updated.id, &updated.label());
        Ok(updated)
    }

    pub async fn update_brand(&self, id: i64, payload: UpdateBrandPayload) -> Result<ExtinguisherBrand, AppError> {
        let updated = self
            .catalog_repo
            .update_brand(&self.pool, id, payload.name.as_deref().map(str::trim), payload.origin.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound(display_name(CatalogTable::Brands).into()))?;

        self.announce(CatalogTable::Brands, EntityChange::Updated, updated.id, &updated.name);
        Ok(updated)
    }

    pub async fn delete(&self, table: CatalogTable, id: i64) -> Result<(), AppError> {
        if !self.catalog_repo.delete(&self.pool, table, id).await? {
            return Err(AppError::NotFound(display_name(table).into()));
        }
        self.announce(table, EntityChange::Deleted, id, &format!("#{}", id));
        Ok(())
    }

    fn announce(&self, table: CatalogTable, kind: EntityChange, id: i64, label: &str) {
        tracing::info!("📚 Catálogo {}: {} {:?}", table.table(), label, kind);
        let action = match kind {
            EntityChange::Created => "criado",
            EntityChange::Updated => "atualizado",
            EntityChange::Deleted => "removido",
        };
        self.bus.publish_entity(
            table.entity(),
            kind,
            json!({ "id": id }),
            Some(format!("{} {} {}", display_name(table), label, action)),
        );
    }
}
