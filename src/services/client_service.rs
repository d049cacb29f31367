// src/services/client_service.rs

use serde_json::json;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::ClientRepository,
    models::clients::{Client, ClientPayload},
    realtime::{EntityChange, NotificationBus},
};

// RUC repetido chega aqui como Conflict("clients_tax_id_key").
fn tax_id_conflict(e: AppError) -> AppError {
    match e {
        AppError::Conflict(_) => AppError::Conflict("Já existe um cliente com este RUC".into()),
        other => other,
    }
}

#[derive(Clone)]
pub struct ClientService {
    client_repo: ClientRepository,
    pool: PgPool,
    bus: NotificationBus,
}

impl ClientService {
    pub fn new(client_repo: ClientRepository, pool: PgPool, bus: NotificationBus) -> Self {
        Self { client_repo, pool, bus }
    }

    pub async fn list(&self) -> Result<Vec<Client>, AppError> {
        self.client_repo.list().await
    }

    pub async fn get(&self, id: i64) -> Result<Client, AppError> {
        self.client_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cliente".into()))
    }

    pub async fn create(&self, payload: ClientPayload) -> Result<Client, AppError> {
        let mut tx = self.pool.begin().await?;
        let client = self
            .client_repo
            .create(&mut *tx, &payload)
            .await
            .map_err(tax_id_conflict)?;
        tx.commit().await?;

        tracing::info!("🏢 Cliente {} ({}) criado", client.name, client.tax_id);
        self.bus.publish_entity(
            "client",
            EntityChange::Created,
            json!({ "id": client.id, "name": client.name }),
            Some(format!("Cliente {} criado", client.name)),
        );
        Ok(client)
    }

    pub async fn update(&self, id: i64, payload: ClientPayload) -> Result<Client, AppError> {
        let mut tx = self.pool.begin().await?;
        let client = self
            .client_repo
            .update(&mut *tx, id, &payload)
            .await
            .map_err(tax_id_conflict)?
            .ok_or_else(|| AppError::NotFound("Cliente".into()))?;
        tx.commit().await?;

        self.bus.publish_entity(
            "client",
            EntityChange::Updated,
            json!({ "id": client.id }),
            Some(format!("Cliente {} atualizado", client.name)),
        );
        Ok(client)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        if !self.client_repo.delete(&mut *tx, id).await? {
            return Err(AppError::NotFound("Cliente".into()));
        }
        tx.commit().await?;

        tracing::info!("🗑️ Cliente {} removido", id);
        self.bus
            .publish_entity("client", EntityChange::Deleted, json!({ "id": id }), None);
        Ok(())
    }
}
