// src/db/order_repo.rs

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;

use crate::{
    common::error::AppError,
    db::store::{RecordStore, StoreTx},
    models::{
        catalog::{ExtinguisherCapacity, ExtinguisherType},
        orders::{ExtinguisherRecord, LineItemInput, NewExtinguisher, NewOrder, Order, OrderLineDetail},
        photos::{NewPhoto, Photo, PhotoKind},
    },
};

// Implementação do RecordStore sobre o Postgres.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx: Some(tx) }))
    }
}

// O `Option` só fica vazio depois do commit. Se o valor for descartado
// antes disso, o sqlx faz o rollback automaticamente no drop.
pub struct PgStoreTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStoreTx {
    fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::StorageError("Transação já finalizada".into()))
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    // ---
    // ORDENS
    // ---

    async fn max_order_id(&mut self) -> Result<i64, AppError> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM work_orders")
            .fetch_one(self.conn()?)
            .await?;
        Ok(max.unwrap_or(0))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, AppError> {
        let created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO work_orders (
                order_number, client_id, pickup_date, requested_count,
                pickup_address, pickup_contact, contact_phone, notes,
                status, stage, assigned_workers, ever_assignment_confirmed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(&order.order_number)
        .bind(order.client_id)
        .bind(order.pickup_date)
        .bind(order.requested_count)
        .bind(&order.pickup_address)
        .bind(&order.pickup_contact)
        .bind(&order.contact_phone)
        .bind(&order.notes)
        .bind(order.status)
        .bind(order.stage)
        .bind(&order.assigned_workers)
        .bind(order.ever_assignment_confirmed)
        .fetch_one(self.conn()?)
        .await?;

        Ok(created)
    }

    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM work_orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(order)
    }

    // Os indicadores de foto ficam de fora: só `set_photo_flag` os altera.
    async fn update_order(&mut self, order: &Order) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE work_orders SET
                status = $2,
                stage = $3,
                notes = $4,
                assigned_workers = $5,
                picked_up = $6,
                picked_up_on = $7,
                worker_completed_at = $8,
                office_reviewed_at = $9,
                selected_recharge_date = $10,
                sent_to_office = $11,
                sent_to_office_at = $12,
                ever_marked_picked_up = $13,
                ever_assignment_confirmed = $14,
                review_finalized = $15
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.status)
        .bind(order.stage)
        .bind(&order.notes)
        .bind(&order.assigned_workers)
        .bind(order.picked_up)
        .bind(order.picked_up_on)
        .bind(order.worker_completed_at)
        .bind(order.office_reviewed_at)
        .bind(&order.selected_recharge_date)
        .bind(order.sent_to_office)
        .bind(order.sent_to_office_at)
        .bind(order.ever_marked_picked_up)
        .bind(order.ever_assignment_confirmed)
        .bind(order.review_finalized)
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn delete_order(&mut self, order_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM work_orders WHERE id = $1")
            .bind(order_id)
            .execute(self.conn()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Ordem".into()));
        }
        Ok(())
    }

    async fn list_orders(&mut self) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>("SELECT * FROM work_orders ORDER BY created_at DESC, id DESC")
            .fetch_all(self.conn()?)
            .await?;
        Ok(orders)
    }

    async fn registered_counts(&mut self) -> Result<HashMap<i64, i64>, AppError> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT order_id, COUNT(*)
            FROM extinguishers
            WHERE order_id IS NOT NULL AND btrim(serial) <> ''
            GROUP BY order_id
            "#,
        )
        .fetch_all(self.conn()?)
        .await?;
        Ok(rows.into_iter().collect())
    }

    // ---
    // DETALHES
    // ---

    async fn insert_line_detail(
        &mut self,
        order_id: i64,
        item: &LineItemInput,
    ) -> Result<OrderLineDetail, AppError> {
        let detail = sqlx::query_as::<_, OrderLineDetail>(
            r#"
            INSERT INTO order_line_details (order_id, type_id, capacity_id, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(item.type_id)
        .bind(item.capacity_id)
        .bind(item.quantity)
        .fetch_one(self.conn()?)
        .await?;
        Ok(detail)
    }

    async fn list_line_details(&mut self, order_id: i64) -> Result<Vec<OrderLineDetail>, AppError> {
        let details = sqlx::query_as::<_, OrderLineDetail>(
            "SELECT * FROM order_line_details WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(self.conn()?)
        .await?;
        Ok(details)
    }

    // ---
    // EXTINTORES
    // ---

    async fn insert_extinguisher(
        &mut self,
        client_id: i64,
        order_id: i64,
        fields: &NewExtinguisher,
    ) -> Result<ExtinguisherRecord, AppError> {
        let record = sqlx::query_as::<_, ExtinguisherRecord>(
            r#"
            INSERT INTO extinguishers (
                client_id, order_id, serial, kind, capacity, brand,
                recharge_date, recharge_expiry, observations
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(order_id)
        .bind(&fields.serial)
        .bind(&fields.kind)
        .bind(&fields.capacity)
        .bind(&fields.brand)
        .bind(&fields.recharge_date)
        .bind(&fields.recharge_expiry)
        .bind(&fields.observations)
        .fetch_one(self.conn()?)
        .await?;
        Ok(record)
    }

    async fn list_extinguishers(&mut self, order_id: i64) -> Result<Vec<ExtinguisherRecord>, AppError> {
        let records = sqlx::query_as::<_, ExtinguisherRecord>(
            "SELECT * FROM extinguishers WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(self.conn()?)
        .await?;
        Ok(records)
    }

    async fn find_extinguisher(&mut self, extinguisher_id: i64) -> Result<Option<ExtinguisherRecord>, AppError> {
        let record = sqlx::query_as::<_, ExtinguisherRecord>("SELECT * FROM extinguishers WHERE id = $1")
            .bind(extinguisher_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(record)
    }

    async fn update_extinguisher(&mut self, record: &ExtinguisherRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE extinguishers SET
                serial = $2, kind = $3, capacity = $4, brand = $5,
                recharge_date = $6, recharge_expiry = $7, observations = $8, status = $9
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.serial)
        .bind(&record.kind)
        .bind(&record.capacity)
        .bind(&record.brand)
        .bind(&record.recharge_date)
        .bind(&record.recharge_expiry)
        .bind(&record.observations)
        .bind(&record.status)
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn delete_extinguisher(&mut self, extinguisher_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM extinguishers WHERE id = $1")
            .bind(extinguisher_id)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn delete_blank_extinguishers(&mut self, order_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM extinguishers WHERE order_id = $1 AND btrim(serial) = ''")
            .bind(order_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_order_extinguishers(&mut self, order_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM extinguishers WHERE order_id = $1")
            .bind(order_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // FOTOS
    // ---
    // O nome da tabela vem do enum `PhotoKind`, nunca de entrada do usuário.

    async fn insert_photo(&mut self, kind: PhotoKind, photo: &NewPhoto) -> Result<Photo, AppError> {
        let sql = format!(
            "INSERT INTO {} (order_id, file_name, relative_path, captured_at, size_bytes) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
            kind.table()
        );
        let created = sqlx::query_as::<_, Photo>(&sql)
            .bind(photo.order_id)
            .bind(&photo.file_name)
            .bind(&photo.relative_path)
            .bind(photo.captured_at)
            .bind(photo.size_bytes)
            .fetch_one(self.conn()?)
            .await?;
        Ok(created)
    }

    async fn find_photo(&mut self, kind: PhotoKind, photo_id: i64) -> Result<Option<Photo>, AppError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", kind.table());
        let photo = sqlx::query_as::<_, Photo>(&sql)
            .bind(photo_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(photo)
    }

    async fn list_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<Vec<Photo>, AppError> {
        let sql = format!(
            "SELECT * FROM {} WHERE order_id = $1 ORDER BY captured_at DESC, id DESC",
            kind.table()
        );
        let photos = sqlx::query_as::<_, Photo>(&sql)
            .bind(order_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(photos)
    }

    async fn count_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE order_id = $1", kind.table());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(order_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(count)
    }

    async fn delete_photo(&mut self, kind: PhotoKind, photo_id: i64) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        sqlx::query(&sql).bind(photo_id).execute(self.conn()?).await?;
        Ok(())
    }

    async fn delete_order_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<u64, AppError> {
        let sql = format!("DELETE FROM {} WHERE order_id = $1", kind.table());
        let result = sqlx::query(&sql).bind(order_id).execute(self.conn()?).await?;
        Ok(result.rows_affected())
    }

    async fn set_photo_flag(&mut self, kind: PhotoKind, order_id: i64, value: bool) -> Result<(), AppError> {
        let sql = format!("UPDATE work_orders SET {} = $2 WHERE id = $1", kind.order_flag_column());
        sqlx::query(&sql)
            .bind(order_id)
            .bind(value)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    // ---
    // REFERÊNCIAS
    // ---

    async fn find_type(&mut self, type_id: i64) -> Result<Option<ExtinguisherType>, AppError> {
        let found = sqlx::query_as::<_, ExtinguisherType>("SELECT * FROM extinguisher_types WHERE id = $1")
            .bind(type_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(found)
    }

    async fn find_capacity(&mut self, capacity_id: i64) -> Result<Option<ExtinguisherCapacity>, AppError> {
        let found =
            sqlx::query_as::<_, ExtinguisherCapacity>("SELECT * FROM extinguisher_capacities WHERE id = $1")
                .bind(capacity_id)
                .fetch_optional(self.conn()?)
                .await?;
        Ok(found)
    }

    async fn client_exists(&mut self, client_id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1)")
            .bind(client_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(exists)
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}
