// src/services/extinguisher_service.rs
//
// Cadastro avulso de extintores (fora das ordens). Os extintores gerados por
// uma ordem só mudam pela planilha da ordem, que recalcula o status dela.

use serde_json::json;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::ExtinguisherRepository,
    models::{
        extinguishers::{CreateExtinguisherPayload, ExtinguisherView, UpdateExtinguisherPayload},
        orders::ExtinguisherRecord,
    },
    realtime::{EntityChange, NotificationBus},
};

fn ensure_standalone(record: &ExtinguisherRecord) -> Result<(), AppError> {
    match record.order_id {
        Some(order_id) => Err(AppError::PreconditionFailed(format!(
            "o extintor {} pertence à ordem {}; altere pela planilha da ordem",
            record.id, order_id
        ))),
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct ExtinguisherService {
    extinguisher_repo: ExtinguisherRepository,
    pool: PgPool,
    bus: NotificationBus,
}

impl ExtinguisherService {
    pub fn new(extinguisher_repo: ExtinguisherRepository, pool: PgPool, bus: NotificationBus) -> Self {
        Self {
            extinguisher_repo,
            pool,
            bus,
        }
    }

    pub async fn list(&self, client_id: Option<i64>) -> Result<Vec<ExtinguisherView>, AppError> {
        self.extinguisher_repo.list(client_id).await
    }

    pub async fn get(&self, id: i64) -> Result<ExtinguisherView, AppError> {
        self.extinguisher_repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Extintor".into()))
    }

    pub async fn create(&self, payload: CreateExtinguisherPayload) -> Result<ExtinguisherRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        if !self
            .extinguisher_repo
            .client_is_active(&mut *tx, payload.client_id)
            .await?
        {
            return Err(AppError::NotFound("Cliente".into()));
        }
        let record = self.extinguisher_repo.create(&mut *tx, &payload).await?;
        tx.commit().await?;

        tracing::info!("🧯 Extintor {} '{}' cadastrado para o cliente {}", record.id, record.serial, record.client_id);
        self.announce(&record, EntityChange::Created, "cadastrado");
        Ok(record)
    }

    pub async fn update(&self, id: i64, payload: UpdateExtinguisherPayload) -> Result<ExtinguisherRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut record = self
            .extinguisher_repo
            .lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Extintor".into()))?;
        ensure_standalone(&record)?;

        payload.apply(&mut record);
        let record = self.extinguisher_repo.update(&mut *tx, &record).await?;
        tx.commit().await?;

        self.announce(&record, EntityChange::Updated, "atualizado");
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let record = self
            .extinguisher_repo
            .lock(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Extintor".into()))?;
        ensure_standalone(&record)?;

        self.extinguisher_repo.delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Extintor {} removido", id);
        self.announce(&record, EntityChange::Deleted, "removido");
        Ok(())
    }

    fn announce(&self, record: &ExtinguisherRecord, kind: EntityChange, action: &str) {
        self.bus.publish_entity(
            "extinguisher",
            kind,
            json!({ "id": record.id, "serial": record.serial, "clientId": record.client_id }),
            Some(format!("Extintor {} {}", record.serial, action)),
        );
    }
}
