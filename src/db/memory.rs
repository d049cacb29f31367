// src/db/memory.rs
//
// RecordStore em memória para os testes do motor e do rastreador de fotos.
// Cada transação segura o lock durante toda a vida e trabalha numa cópia
// do estado; o `commit` grava a cópia de volta. Sem commit, nada muda.

use async_trait::async_trait;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    common::error::AppError,
    db::store::{RecordStore, StoreTx},
    models::{
        catalog::{ExtinguisherCapacity, ExtinguisherType},
        orders::{ExtinguisherRecord, LineItemInput, NewExtinguisher, NewOrder, Order, OrderLineDetail},
        photos::{NewPhoto, Photo, PhotoKind},
    },
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    next_id: i64,
    pub orders: Vec<Order>,
    pub line_details: Vec<OrderLineDetail>,
    pub extinguishers: Vec<ExtinguisherRecord>,
    pub evidence_photos: Vec<Photo>,
    pub guide_photos: Vec<Photo>,
    pub types: Vec<ExtinguisherType>,
    pub capacities: Vec<ExtinguisherCapacity>,
    pub clients: Vec<i64>,

    // Injeção de falhas
    pub fail_extinguisher_inserts: bool,
    pub fail_photo_inserts: bool,
    // Quando definido, `max_order_id` devolve este valor: simula leituras
    // concorrentes feitas antes de qualquer commit.
    pub frozen_max_order_id: Option<i64>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn photos(&self, kind: PhotoKind) -> &Vec<Photo> {
        match kind {
            PhotoKind::Evidence => &self.evidence_photos,
            PhotoKind::Guide => &self.guide_photos,
        }
    }

    fn photos_mut(&mut self, kind: PhotoKind) -> &mut Vec<Photo> {
        match kind {
            PhotoKind::Evidence => &mut self.evidence_photos,
            PhotoKind::Guide => &mut self.guide_photos,
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Id que o próximo registro inserido vai receber.
    pub async fn peek_next_id(&self) -> i64 {
        self.state.lock().await.next_id + 1
    }

    pub async fn seed_client(&self) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.clients.push(id);
        id
    }

    pub async fn seed_type(&self, name: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.types.push(ExtinguisherType {
            id,
            name: name.to_string(),
            full_name: name.to_string(),
            fire_class: None,
            description: None,
            color: "#6c757d".into(),
            active: true,
        });
        id
    }

    pub async fn seed_capacity(&self, capacity: &str, unit: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.capacities.push(ExtinguisherCapacity {
            id,
            capacity: capacity.to_string(),
            unit: unit.to_string(),
            active: true,
        });
        id
    }

    pub async fn set_fail_extinguisher_inserts(&self, value: bool) {
        self.state.lock().await.fail_extinguisher_inserts = value;
    }

    pub async fn set_fail_photo_inserts(&self, value: bool) {
        self.state.lock().await.fail_photo_inserts = value;
    }

    /// Congela a leitura de `max_order_id` no valor atual.
    pub async fn freeze_max_order_id(&self) {
        let mut state = self.state.lock().await;
        let current = state.orders.iter().map(|o| o.id).max().unwrap_or(0);
        state.frozen_max_order_id = Some(current);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn max_order_id(&mut self) -> Result<i64, AppError> {
        if let Some(frozen) = self.working.frozen_max_order_id {
            return Ok(frozen);
        }
        Ok(self.working.orders.iter().map(|o| o.id).max().unwrap_or(0))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, AppError> {
        if self.working.orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(AppError::Conflict("work_orders_order_number_key".into()));
        }
        let id = self.working.next_id();
        let created = Order {
            id,
            order_number: order.order_number.clone(),
            client_id: order.client_id,
            pickup_date: order.pickup_date,
            requested_count: order.requested_count,
            pickup_address: order.pickup_address.clone(),
            pickup_contact: order.pickup_contact.clone(),
            contact_phone: order.contact_phone.clone(),
            notes: order.notes.clone(),
            status: order.status,
            stage: order.stage,
            assigned_workers: order.assigned_workers.clone(),
            picked_up: false,
            picked_up_on: None,
            worker_completed_at: None,
            office_reviewed_at: None,
            selected_recharge_date: None,
            sent_to_office: false,
            sent_to_office_at: None,
            ever_marked_picked_up: false,
            ever_assignment_confirmed: order.ever_assignment_confirmed,
            review_finalized: false,
            has_photo_evidence: false,
            has_pickup_guide_photo: false,
            created_at: Utc::now(),
        };
        self.working.orders.push(created.clone());
        Ok(created)
    }

    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>, AppError> {
        Ok(self.working.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), AppError> {
        let existing = self
            .working
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| AppError::NotFound("Ordem".into()))?;
        // Mesma regra do Postgres: os indicadores de foto não passam por aqui.
        let (evidence, guide) = (existing.has_photo_evidence, existing.has_pickup_guide_photo);
        *existing = order.clone();
        existing.has_photo_evidence = evidence;
        existing.has_pickup_guide_photo = guide;
        Ok(())
    }

    async fn delete_order(&mut self, order_id: i64) -> Result<(), AppError> {
        let before = self.working.orders.len();
        self.working.orders.retain(|o| o.id != order_id);
        if self.working.orders.len() == before {
            return Err(AppError::NotFound("Ordem".into()));
        }
        self.working.line_details.retain(|d| d.order_id != order_id);
        Ok(())
    }

    async fn list_orders(&mut self) -> Result<Vec<Order>, AppError> {
        let mut orders = self.working.orders.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn registered_counts(&mut self) -> Result<HashMap<i64, i64>, AppError> {
        let mut counts = HashMap::new();
        for record in self.working.extinguishers.iter().filter(|e| e.is_registered()) {
            if let Some(order_id) = record.order_id {
                *counts.entry(order_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn insert_line_detail(
        &mut self,
        order_id: i64,
        item: &LineItemInput,
    ) -> Result<OrderLineDetail, AppError> {
        let detail = OrderLineDetail {
            id: self.working.next_id(),
            order_id,
            type_id: item.type_id,
            capacity_id: item.capacity_id,
            quantity: item.quantity,
        };
        self.working.line_details.push(detail.clone());
        Ok(detail)
    }

    async fn list_line_details(&mut self, order_id: i64) -> Result<Vec<OrderLineDetail>, AppError> {
        Ok(self.working.line_details.iter().filter(|d| d.order_id == order_id).cloned().collect())
    }

    async fn insert_extinguisher(
        &mut self,
        client_id: i64,
        order_id: i64,
        fields: &NewExtinguisher,
    ) -> Result<ExtinguisherRecord, AppError> {
        if self.working.fail_extinguisher_inserts {
            return Err(AppError::StorageError("falha injetada em extinguishers".into()));
        }
        let record = ExtinguisherRecord {
            id: self.working.next_id(),
            client_id,
            order_id: Some(order_id),
            serial: fields.serial.clone(),
            kind: fields.kind.clone(),
            capacity: fields.capacity.clone(),
            brand: fields.brand.clone(),
            recharge_date: fields.recharge_date.clone(),
            recharge_expiry: fields.recharge_expiry.clone(),
            observations: fields.observations.clone(),
            status: "Pendiente".into(),
            created_at: Utc::now(),
        };
        self.working.extinguishers.push(record.clone());
        Ok(record)
    }

    async fn list_extinguishers(&mut self, order_id: i64) -> Result<Vec<ExtinguisherRecord>, AppError> {
        Ok(self
            .working
            .extinguishers
            .iter()
            .filter(|e| e.order_id == Some(order_id))
            .cloned()
            .collect())
    }

    async fn find_extinguisher(&mut self, extinguisher_id: i64) -> Result<Option<ExtinguisherRecord>, AppError> {
        Ok(self.working.extinguishers.iter().find(|e| e.id == extinguisher_id).cloned())
    }

    async fn update_extinguisher(&mut self, record: &ExtinguisherRecord) -> Result<(), AppError> {
        if let Some(existing) = self.working.extinguishers.iter_mut().find(|e| e.id == record.id) {
            *existing = record.clone();
        }
        Ok(())
    }

    async fn delete_extinguisher(&mut self, extinguisher_id: i64) -> Result<(), AppError> {
        self.working.extinguishers.retain(|e| e.id != extinguisher_id);
        Ok(())
    }

    async fn delete_blank_extinguishers(&mut self, order_id: i64) -> Result<u64, AppError> {
        let before = self.working.extinguishers.len();
        self.working
            .extinguishers
            .retain(|e| e.order_id != Some(order_id) || e.is_registered());
        Ok((before - self.working.extinguishers.len()) as u64)
    }

    async fn delete_order_extinguishers(&mut self, order_id: i64) -> Result<u64, AppError> {
        let before = self.working.extinguishers.len();
        self.working.extinguishers.retain(|e| e.order_id != Some(order_id));
        Ok((before - self.working.extinguishers.len()) as u64)
    }

    async fn insert_photo(&mut self, kind: PhotoKind, photo: &NewPhoto) -> Result<Photo, AppError> {
        if self.working.fail_photo_inserts {
            return Err(AppError::StorageError("falha injetada em fotos".into()));
        }
        let created = Photo {
            id: self.working.next_id(),
            order_id: photo.order_id,
            file_name: photo.file_name.clone(),
            relative_path: photo.relative_path.clone(),
            captured_at: photo.captured_at,
            size_bytes: photo.size_bytes,
        };
        self.working.photos_mut(kind).push(created.clone());
        Ok(created)
    }

    async fn find_photo(&mut self, kind: PhotoKind, photo_id: i64) -> Result<Option<Photo>, AppError> {
        Ok(self.working.photos(kind).iter().find(|p| p.id == photo_id).cloned())
    }

    async fn list_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<Vec<Photo>, AppError> {
        let mut photos: Vec<Photo> = self
            .working
            .photos(kind)
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| b.captured_at.cmp(&a.captured_at).then(b.id.cmp(&a.id)));
        Ok(photos)
    }

    async fn count_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<i64, AppError> {
        Ok(self.working.photos(kind).iter().filter(|p| p.order_id == order_id).count() as i64)
    }

    async fn delete_photo(&mut self, kind: PhotoKind, photo_id: i64) -> Result<(), AppError> {
        self.working.photos_mut(kind).retain(|p| p.id != photo_id);
        Ok(())
    }

    async fn delete_order_photos(&mut self, kind: PhotoKind, order_id: i64) -> Result<u64, AppError> {
        let photos = self.working.photos_mut(kind);
        let before = photos.len();
        photos.retain(|p| p.order_id != order_id);
        Ok((before - photos.len()) as u64)
    }

    async fn set_photo_flag(&mut self, kind: PhotoKind, order_id: i64, value: bool) -> Result<(), AppError> {
        if let Some(order) = self.working.orders.iter_mut().find(|o| o.id == order_id) {
            match kind {
                PhotoKind::Evidence => order.has_photo_evidence = value,
                PhotoKind::Guide => order.has_pickup_guide_photo = value,
            }
        }
        Ok(())
    }

    async fn find_type(&mut self, type_id: i64) -> Result<Option<ExtinguisherType>, AppError> {
        Ok(self.working.types.iter().find(|t| t.id == type_id).cloned())
    }

    async fn find_capacity(&mut self, capacity_id: i64) -> Result<Option<ExtinguisherCapacity>, AppError> {
        Ok(self.working.capacities.iter().find(|c| c.id == capacity_id).cloned())
    }

    async fn client_exists(&mut self, client_id: i64) -> Result<bool, AppError> {
        Ok(self.working.clients.contains(&client_id))
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        *self.guard = self.working.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::orders::{OrderStage, OrderStatus};
    use chrono::NaiveDate;

    fn new_order(number: &str, client_id: i64) -> NewOrder {
        NewOrder {
            order_number: number.into(),
            client_id,
            pickup_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            requested_count: 1,
            pickup_address: String::new(),
            pickup_contact: String::new(),
            contact_phone: String::new(),
            notes: String::new(),
            status: OrderStatus::Pending,
            stage: OrderStage::Creada,
            assigned_workers: vec![],
            ever_assignment_confirmed: false,
        }
    }

    #[tokio::test]
    async fn uncommitted_transaction_is_discarded() {
        let store = MemoryStore::new();
        let client = store.seed_client().await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_order(&new_order("OT-00001", client)).await.unwrap();
        }

        assert!(store.snapshot().await.orders.is_empty());
    }

    #[tokio::test]
    async fn duplicate_order_number_is_a_conflict() {
        let store = MemoryStore::new();
        let client = store.seed_client().await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&new_order("OT-00001", client)).await.unwrap();
        let err = tx.insert_order(&new_order("OT-00001", client)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
