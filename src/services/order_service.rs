// src/services/order_service.rs

use chrono::{Local, Utc};
use serde_json::json;
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::store::{RecordStore, StoreTx},
    models::{
        orders::{
            CreateOrderInput, ExtinguisherField, ExtinguisherRecord, NewExtinguisher, NewOrder, Order,
            OrderDetail, OrderLineDetail, OrderStatus, OrderSummary, PickupOutcome, TransitionOutcome,
        },
        photos::PhotoKind,
    },
    realtime::{EntityChange, NotificationBus},
    services::lifecycle,
    storage::BlobStore,
};

/// Nome da constraint UNIQUE de `work_orders.order_number`.
pub const ORDER_NUMBER_CONSTRAINT: &str = "work_orders_order_number_key";

pub fn format_order_number(sequence: i64) -> String {
    format!("OT-{:05}", sequence)
}

// Motor do ciclo de vida das ordens. Cada operação roda em uma única
// transação e só publica no barramento depois do commit.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    bus: NotificationBus,
    number_retries: u32,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        bus: NotificationBus,
        number_retries: u32,
    ) -> Self {
        Self {
            store,
            blobs,
            bus,
            number_retries,
        }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderDetail, AppError> {
        // 1. Validação antes de qualquer escrita
        let client_id = input
            .client_id
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::ValidationError("O cliente é obrigatório".into()))?;
        let pickup_date = input
            .pickup_date
            .ok_or_else(|| AppError::ValidationError("A data de recojo é obrigatória".into()))?;
        let requested_count = input
            .requested_count
            .filter(|n| *n > 0)
            .ok_or_else(|| AppError::ValidationError("A quantidade de extintores deve ser maior que zero".into()))?;
        if input.line_items.iter().any(|item| item.quantity <= 0) {
            return Err(AppError::ValidationError("Cada item deve ter quantidade maior que zero".into()));
        }

        // 2. Numeração com retry: a UNIQUE do banco decide quem fica com o número
        let mut attempt: u32 = 0;
        let detail = loop {
            match self.try_create(&input, client_id, pickup_date, requested_count, attempt).await {
                Ok(detail) => break detail,
                Err(AppError::Conflict(constraint))
                    if constraint == ORDER_NUMBER_CONSTRAINT && attempt < self.number_retries =>
                {
                    tracing::warn!("⚠️ Número de ordem em uso (tentativa {}), tentando o próximo", attempt + 1);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let order = &detail.order;
        tracing::info!(
            "✅ Ordem {} criada ({} extintores pendentes)",
            order.order_number,
            detail.extinguishers.len()
        );
        self.bus
            .publish_order(order.id, "order_created", json!({ "orderNumber": order.order_number }));
        self.bus.publish_entity(
            "order",
            EntityChange::Created,
            json!({ "id": order.id, "orderNumber": order.order_number }),
            Some(format!("Ordem {} criada", order.order_number)),
        );

        Ok(detail)
    }

    async fn try_create(
        &self,
        input: &CreateOrderInput,
        client_id: i64,
        pickup_date: chrono::NaiveDate,
        requested_count: i32,
        attempt: u32,
    ) -> Result<OrderDetail, AppError> {
        let mut tx = self.store.begin().await?;

        if !tx.client_exists(client_id).await? {
            return Err(AppError::NotFound("Cliente".into()));
        }
        for item in &input.line_items {
            if tx.find_type(item.type_id).await?.is_none() {
                return Err(AppError::ValidationError(format!("Tipo de extintor {} inexistente", item.type_id)));
            }
            if tx.find_capacity(item.capacity_id).await?.is_none() {
                return Err(AppError::ValidationError(format!("Capacidade {} inexistente", item.capacity_id)));
            }
        }

        let workers = input
            .workers
            .as_deref()
            .map(lifecycle::parse_workers)
            .unwrap_or_default();
        let (stage, status, confirmed) = lifecycle::initial_placement(&workers);

        let sequence = tx.max_order_id().await? + 1 + i64::from(attempt);
        let order = tx
            .insert_order(&NewOrder {
                order_number: format_order_number(sequence),
                client_id,
                pickup_date,
                requested_count,
                pickup_address: input.pickup_address.trim().to_string(),
                pickup_contact: input.pickup_contact.trim().to_string(),
                contact_phone: input.contact_phone.trim().to_string(),
                notes: input.notes.clone(),
                status,
                stage,
                assigned_workers: workers,
                ever_assignment_confirmed: confirmed,
            })
            .await?;

        let mut line_details = Vec::with_capacity(input.line_items.len());
        for item in &input.line_items {
            line_details.push(tx.insert_line_detail(order.id, item).await?);
        }

        let declared: i32 = input.line_items.iter().map(|i| i.quantity).sum();
        if declared > requested_count {
            tracing::warn!(
                "Itens da ordem {} somam {} extintores, mas só {} foram solicitados; gerando {}",
                order.order_number,
                declared,
                requested_count,
                requested_count
            );
        }
        generate_placeholders(tx.as_mut(), &order, &line_details).await?;

        let extinguishers = tx.list_extinguishers(order.id).await?;
        tx.commit().await?;

        Ok(OrderDetail {
            order,
            line_details,
            extinguishers,
        })
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn get_order(&self, order_id: i64) -> Result<OrderDetail, AppError> {
        let mut tx = self.store.begin().await?;
        let order = load_order(tx.as_mut(), order_id).await?;
        let line_details = tx.list_line_details(order_id).await?;
        let extinguishers = tx.list_extinguishers(order_id).await?;
        Ok(OrderDetail {
            order,
            line_details,
            extinguishers,
        })
    }

    pub async fn list_orders(&self) -> Result<Vec<OrderSummary>, AppError> {
        let mut tx = self.store.begin().await?;
        let orders = tx.list_orders().await?;
        let counts = tx.registered_counts().await?;
        Ok(orders
            .into_iter()
            .map(|order| {
                let registered_count = counts.get(&order.id).copied().unwrap_or(0) as usize;
                OrderSummary {
                    order,
                    registered_count,
                }
            })
            .collect())
    }

    // =========================================================================
    //  TRANSIÇÕES DE ETAPA
    // =========================================================================

    pub async fn assign_workers(&self, order_id: i64, workers_text: &str) -> Result<Order, AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;

        lifecycle::assign_workers(&mut order, lifecycle::parse_workers(workers_text));
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!(
            "👷 Ordem {}: trabalhadores {:?} (etapa {})",
            order.order_number,
            order.assigned_workers,
            order.stage.as_str()
        );
        self.bus.publish_order(
            order.id,
            "workers_assigned",
            json!({ "workers": order.assigned_workers, "stage": order.stage }),
        );
        Ok(order)
    }

    pub async fn confirm_assignment(&self, order_id: i64) -> Result<TransitionOutcome, AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;

        let is_first_time = lifecycle::confirm_assignment(&mut order)?;
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!("✅ Ordem {}: atribuição confirmada (primeira vez: {})", order.order_number, is_first_time);
        self.bus.publish_order(
            order.id,
            "workers_confirmed",
            json!({ "workers": order.assigned_workers, "isFirstTime": is_first_time }),
        );
        self.bus.publish_order(order.id, "order_updated", json!({ "stage": order.stage }));

        Ok(TransitionOutcome {
            stage: order.stage,
            is_first_time,
        })
    }

    pub async fn set_picked_up(&self, order_id: i64, picked_up: bool) -> Result<PickupOutcome, AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;

        let mut generated = 0;
        let mut removed = 0;
        let is_first_time = if picked_up {
            let first = lifecycle::mark_picked_up(&mut order, Local::now().date_naive());
            tx.update_order(&order).await?;
            let details = tx.list_line_details(order.id).await?;
            // Se a geração falhar no meio, o drop da transação desfaz a etapa também.
            generated = generate_placeholders(tx.as_mut(), &order, &details).await?;
            first
        } else {
            lifecycle::unmark_picked_up(&mut order);
            tx.update_order(&order).await?;
            removed = tx.delete_blank_extinguishers(order.id).await?;
            false
        };

        let total_extinguishers = tx.list_extinguishers(order.id).await?.len();
        tx.commit().await?;

        tracing::info!(
            "📦 Ordem {}: {} / {} gerados={} removidos={} primeira_vez={}",
            order.order_number,
            order.stage.as_str(),
            order.status.label(),
            generated,
            removed,
            is_first_time
        );
        self.bus
            .publish_order(order.id, "recogido_actualizado", json!({ "pickedUp": picked_up }));

        Ok(PickupOutcome {
            picked_up,
            stage: order.stage,
            is_first_time,
            generated,
            removed,
            total_extinguishers,
        })
    }

    pub async fn send_to_review(
        &self,
        order_id: i64,
        selected_recharge_date: Option<String>,
    ) -> Result<TransitionOutcome, AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;

        let is_first_time = lifecycle::send_to_review(&mut order, Utc::now(), selected_recharge_date);
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!("📨 Ordem {} enviada para revisão (primeira vez: {})", order.order_number, is_first_time);
        self.bus.publish_order(
            order.id,
            "order_updated",
            json!({ "stage": order.stage, "sentToOffice": order.sent_to_office }),
        );

        Ok(TransitionOutcome {
            stage: order.stage,
            is_first_time,
        })
    }

    pub async fn finalize_review(&self, order_id: i64) -> Result<Order, AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;

        lifecycle::finalize_review(&mut order, Utc::now());
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!("🏁 Ordem {} finalizada pelo escritório", order.order_number);
        self.bus.publish_order(
            order.id,
            "order_updated",
            json!({ "stage": order.stage, "status": order.status }),
        );
        self.bus.publish_entity(
            "order",
            EntityChange::Updated,
            json!({ "id": order.id }),
            Some(format!("Ordem {} finalizada", order.order_number)),
        );
        Ok(order)
    }

    // =========================================================================
    //  EDIÇÃO DA ORDEM
    // =========================================================================

    pub async fn update_order_info(
        &self,
        order_id: i64,
        status: Option<OrderStatus>,
        notes: Option<String>,
    ) -> Result<Order, AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;

        if let Some(status) = status {
            order.status = status;
        }
        if let Some(notes) = notes {
            order.notes = notes;
        }
        tx.update_order(&order).await?;
        tx.commit().await?;

        self.bus.publish_order(
            order.id,
            "order_updated",
            json!({ "status": order.status, "notes": order.notes }),
        );
        self.bus.publish_entity(
            "order",
            EntityChange::Updated,
            json!({ "id": order.id }),
            Some(format!("Ordem {} atualizada ({})", order.order_number, order.status.label())),
        );
        Ok(order)
    }

    pub async fn save_recharge_date(&self, order_id: i64, date: &str) -> Result<Order, AppError> {
        let date = date.trim();
        if date.is_empty() {
            return Err(AppError::ValidationError("A data de recarga é obrigatória".into()));
        }

        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;
        order.selected_recharge_date = Some(date.to_string());
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!("📅 Ordem {}: data de recarga {}", order.order_number, date);
        self.bus
            .publish_order(order.id, "recharge_date_saved", json!({ "date": date }));
        Ok(order)
    }

    pub async fn delete_order(&self, order_id: i64) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        let order = load_order(tx.as_mut(), order_id).await?;

        // Anexos, depois extintores, depois a própria ordem.
        let mut photos = 0;
        for kind in [PhotoKind::Evidence, PhotoKind::Guide] {
            photos += tx.delete_order_photos(kind, order_id).await?;
        }
        let extinguishers = tx.delete_order_extinguishers(order_id).await?;
        tx.delete_order(order_id).await?;
        tx.commit().await?;

        // Os arquivos só saem depois do commit; falha aqui não desfaz a exclusão.
        for kind in [PhotoKind::Evidence, PhotoKind::Guide] {
            let dir = kind.order_directory(order_id);
            if let Err(e) = self.blobs.delete_dir(&dir).await {
                tracing::warn!("Não foi possível remover {}: {}", dir, e);
            }
        }

        tracing::info!(
            "🗑️ Ordem {} removida ({} fotos, {} extintores)",
            order.order_number,
            photos,
            extinguishers
        );
        self.bus
            .publish_order(order_id, "order_deleted", json!({ "orderNumber": order.order_number }));
        self.bus.publish_entity(
            "order",
            EntityChange::Deleted,
            json!({ "id": order_id }),
            Some(format!("Ordem {} removida", order.order_number)),
        );
        Ok(())
    }

    // =========================================================================
    //  PLANILHA DE EXTINTORES
    // =========================================================================

    pub async fn update_extinguisher_cell(
        &self,
        order_id: i64,
        extinguisher_id: i64,
        field: ExtinguisherField,
        value: String,
    ) -> Result<ExtinguisherRecord, AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;
        let mut record = load_child(tx.as_mut(), order_id, extinguisher_id).await?;

        field.apply(&mut record, value.clone());
        tx.update_extinguisher(&record).await?;
        refresh_registration_status(tx.as_mut(), &mut order).await?;
        tx.commit().await?;

        tracing::debug!("✏️ Ordem {}: extintor {} campo {}", order.order_number, extinguisher_id, field.as_str());
        self.bus.publish_order(
            order_id,
            "cell_updated",
            json!({
                "extinguisherId": extinguisher_id,
                "field": field,
                "value": value,
                "status": order.status,
            }),
        );
        Ok(record)
    }

    pub async fn add_extinguisher(
        &self,
        order_id: i64,
        fields: NewExtinguisher,
    ) -> Result<ExtinguisherRecord, AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;

        let record = tx.insert_extinguisher(order.client_id, order.id, &fields).await?;
        refresh_registration_status(tx.as_mut(), &mut order).await?;
        tx.commit().await?;

        self.bus.publish_order(
            order_id,
            "extinguisher_added",
            json!({ "extinguisherId": record.id, "status": order.status }),
        );
        Ok(record)
    }

    pub async fn delete_extinguisher(&self, order_id: i64, extinguisher_id: i64) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(tx.as_mut(), order_id).await?;
        let removed = load_child(tx.as_mut(), order_id, extinguisher_id).await?;

        tx.delete_extinguisher(extinguisher_id).await?;
        if removed.is_registered() {
            demote_if_short(tx.as_mut(), &mut order).await?;
        }
        tx.commit().await?;

        self.bus.publish_order(
            order_id,
            "extinguisher_removed",
            json!({ "extinguisherId": extinguisher_id, "status": order.status }),
        );
        Ok(())
    }
}

// --- Auxiliares dentro da transação ---

async fn load_order(tx: &mut dyn StoreTx, order_id: i64) -> Result<Order, AppError> {
    tx.find_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ordem".into()))
}

async fn load_child(tx: &mut dyn StoreTx, order_id: i64, extinguisher_id: i64) -> Result<ExtinguisherRecord, AppError> {
    tx.find_extinguisher(extinguisher_id)
        .await?
        .filter(|record| record.order_id == Some(order_id))
        .ok_or_else(|| AppError::NotFound("Extintor".into()))
}

/// Gera extintores em branco (tipo e capacidade copiados do catálogo) até a
/// ordem ter `requested_count` registros. Devolve quantos foram criados.
async fn generate_placeholders(
    tx: &mut dyn StoreTx,
    order: &Order,
    details: &[OrderLineDetail],
) -> Result<usize, AppError> {
    let existing = tx.list_extinguishers(order.id).await?.len();
    let plan = lifecycle::plan_placeholders(existing, order.requested_count, details);

    let mut generated = 0;
    for (detail_id, count) in plan {
        let Some(detail) = details.iter().find(|d| d.id == detail_id) else {
            continue;
        };
        let kind = tx.find_type(detail.type_id).await?.map(|t| t.name).unwrap_or_default();
        let capacity = tx
            .find_capacity(detail.capacity_id)
            .await?
            .map(|c| c.label())
            .unwrap_or_default();

        let fields = NewExtinguisher {
            kind,
            capacity,
            ..NewExtinguisher::default()
        };
        for _ in 0..count {
            tx.insert_extinguisher(order.client_id, order.id, &fields).await?;
            generated += 1;
        }
    }
    Ok(generated)
}

async fn registered_count(tx: &mut dyn StoreTx, order_id: i64) -> Result<usize, AppError> {
    Ok(tx
        .list_extinguishers(order_id)
        .await?
        .iter()
        .filter(|e| e.is_registered())
        .count())
}

async fn refresh_registration_status(tx: &mut dyn StoreTx, order: &mut Order) -> Result<(), AppError> {
    let baseline = order.status;
    settle_status(tx, order, baseline).await
}

// Remover um extintor com série pode deixar uma ordem Completada sem séries suficientes.
async fn demote_if_short(tx: &mut dyn StoreTx, order: &mut Order) -> Result<(), AppError> {
    let baseline = match order.status {
        OrderStatus::Completed => OrderStatus::InProgress,
        other => other,
    };
    settle_status(tx, order, baseline).await
}

async fn settle_status(tx: &mut dyn StoreTx, order: &mut Order, baseline: OrderStatus) -> Result<(), AppError> {
    let filled = registered_count(tx, order.id).await?;
    let status = lifecycle::registration_status(baseline, order.requested_count, filled);
    if status != order.status {
        order.status = status;
        tx.update_order(order).await?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        db::memory::MemoryStore,
        models::{
            orders::{LineItemInput, OrderStage},
            photos::NewPhoto,
        },
        realtime::RealtimeEvent,
        storage::memory::MemoryBlobStore,
    };
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use tokio::sync::broadcast;

    pub struct Fixture {
        pub store: MemoryStore,
        pub blobs: Arc<MemoryBlobStore>,
        pub bus: NotificationBus,
        pub service: OrderService,
        pub client: i64,
        pub pqs: i64,
        pub six_kg: i64,
    }

    pub async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let blobs = Arc::new(MemoryBlobStore::new());
        let bus = NotificationBus::new(64);
        let client = store.seed_client().await;
        let pqs = store.seed_type("PQS").await;
        let six_kg = store.seed_capacity("6", "kg").await;
        let service = OrderService::new(Arc::new(store.clone()), blobs.clone(), bus.clone(), 5);
        Fixture {
            store,
            blobs,
            bus,
            service,
            client,
            pqs,
            six_kg,
        }
    }

    impl Fixture {
        pub fn input(&self, requested: i32, quantity: i32, workers: Option<&str>) -> CreateOrderInput {
            CreateOrderInput {
                client_id: Some(self.client),
                pickup_date: NaiveDate::from_ymd_opt(2025, 3, 10),
                requested_count: Some(requested),
                pickup_address: "Av. Industrial 123".into(),
                pickup_contact: "Carlos".into(),
                contact_phone: "999888777".into(),
                notes: String::new(),
                workers: workers.map(str::to_string),
                line_items: if quantity > 0 {
                    vec![LineItemInput {
                        type_id: self.pqs,
                        capacity_id: self.six_kg,
                        quantity,
                    }]
                } else {
                    vec![]
                },
            }
        }

        pub async fn order(&self, order_id: i64) -> Order {
            self.service.get_order(order_id).await.unwrap().order
        }
    }

    fn drain(rx: &mut broadcast::Receiver<crate::realtime::bus::Envelope>) -> Vec<RealtimeEvent> {
        let mut events = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            events.push(envelope.event);
        }
        events
    }

    fn order_kinds(events: &[RealtimeEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                RealtimeEvent::OrderChanged(event) => Some(event.kind.clone()),
                _ => None,
            })
            .collect()
    }

    // --- Criação ---

    #[tokio::test]
    async fn create_with_line_item_generates_placeholders() {
        let fx = fixture().await;
        let detail = fx.service.create_order(fx.input(2, 2, None)).await.unwrap();

        assert_eq!(detail.order.stage, OrderStage::Creada);
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.line_details.len(), 1);
        assert_eq!(detail.extinguishers.len(), 2);
        for record in &detail.extinguishers {
            assert_eq!(record.kind, "PQS");
            assert_eq!(record.capacity, "6kg");
            assert!(record.serial.is_empty());
            assert!(record.brand.is_empty());
            assert_eq!(record.status, "Pendiente");
        }
    }

    #[tokio::test]
    async fn create_with_workers_starts_assigned() {
        let fx = fixture().await;
        let detail = fx
            .service
            .create_order(fx.input(1, 0, Some("Juan Perez, Ana")))
            .await
            .unwrap();

        assert_eq!(detail.order.stage, OrderStage::Asignada);
        assert_eq!(detail.order.status, OrderStatus::InProgress);
        assert!(detail.order.ever_assignment_confirmed);
        assert_eq!(detail.order.assigned_workers, vec!["Juan Perez", "Ana"]);
    }

    #[tokio::test]
    async fn create_rejects_missing_fields_before_writing() {
        let fx = fixture().await;

        let mut no_client = fx.input(2, 0, None);
        no_client.client_id = None;
        let mut no_date = fx.input(2, 0, None);
        no_date.pickup_date = None;
        let zero = fx.input(0, 0, None);

        for input in [no_client, no_date, zero] {
            let err = fx.service.create_order(input).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        assert!(fx.store.snapshot().await.orders.is_empty());
    }

    #[tokio::test]
    async fn create_for_unknown_client_is_not_found() {
        let fx = fixture().await;
        let mut input = fx.input(1, 0, None);
        input.client_id = Some(9_999);

        let err = fx.service.create_order(input).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn placeholders_are_capped_at_requested_count() {
        let fx = fixture().await;
        let detail = fx.service.create_order(fx.input(2, 5, None)).await.unwrap();
        assert_eq!(detail.extinguishers.len(), 2);
        assert_eq!(detail.line_details[0].quantity, 5);
    }

    #[tokio::test]
    async fn order_numbers_are_zero_padded_and_sequential() {
        let fx = fixture().await;
        let first = fx.service.create_order(fx.input(1, 0, None)).await.unwrap().order;
        assert_eq!(first.order_number, "OT-00001");

        let second = fx.service.create_order(fx.input(1, 0, None)).await.unwrap().order;
        assert_eq!(second.order_number, format_order_number(first.id + 1));
    }

    #[tokio::test]
    async fn taken_order_number_is_skipped() {
        let fx = fixture().await;

        // Uma ordem que já ocupa o número que o próximo create calcularia.
        let seeded_id = fx.store.peek_next_id().await;
        {
            let mut tx = fx.store.begin().await.unwrap();
            tx.insert_order(&NewOrder {
                order_number: format_order_number(seeded_id + 1),
                client_id: fx.client,
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
            })
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }

        let created = fx.service.create_order(fx.input(1, 0, None)).await.unwrap().order;
        assert_eq!(created.order_number, format_order_number(seeded_id + 2));
    }

    #[tokio::test]
    async fn overlapping_number_reads_are_resolved_by_retry() {
        let fx = fixture().await;
        // Todas as criações enxergam o mesmo max(id), como se lessem antes de qualquer commit.
        fx.store.freeze_max_order_id().await;
        let service = OrderService::new(Arc::new(fx.store.clone()), fx.blobs.clone(), fx.bus.clone(), 8);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let input = fx.input(1, 1, None);
            handles.push(tokio::spawn(async move { service.create_order(input).await }));
        }

        let mut numbers = HashSet::new();
        for handle in handles {
            let detail = handle.await.unwrap().unwrap();
            numbers.insert(detail.order.order_number);
        }
        assert_eq!(numbers.len(), 8);
        assert_eq!(fx.store.snapshot().await.orders.len(), 8);
    }

    #[tokio::test]
    async fn overlapping_number_reads_conflict_without_retries() {
        let fx = fixture().await;
        fx.store.freeze_max_order_id().await;
        let service = OrderService::new(Arc::new(fx.store.clone()), fx.blobs.clone(), fx.bus.clone(), 0);

        service.create_order(fx.input(1, 1, None)).await.unwrap();
        let err = service.create_order(fx.input(1, 1, None)).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(ref c) if c == ORDER_NUMBER_CONSTRAINT));
        let state = fx.store.snapshot().await;
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.extinguishers.len(), 1);
    }

    // --- Atribuição ---

    #[tokio::test]
    async fn assign_then_confirm_reports_first_time_once() {
        let fx = fixture().await;
        let order = fx.service.create_order(fx.input(2, 2, None)).await.unwrap().order;

        fx.service.assign_workers(order.id, "Juan Perez").await.unwrap();
        let first = fx.service.confirm_assignment(order.id).await.unwrap();
        assert_eq!(first.stage, OrderStage::Asignada);
        assert!(first.is_first_time);
        assert!(fx.order(order.id).await.ever_assignment_confirmed);

        let again = fx.service.confirm_assignment(order.id).await.unwrap();
        assert!(!again.is_first_time);
    }

    #[tokio::test]
    async fn confirming_without_workers_fails_and_changes_nothing() {
        let fx = fixture().await;
        let order = fx.service.create_order(fx.input(1, 0, None)).await.unwrap().order;
        let mut rx = fx.bus.subscribe();

        let err = fx.service.confirm_assignment(order.id).await.unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));

        let reloaded = fx.order(order.id).await;
        assert_eq!(reloaded.stage, OrderStage::Creada);
        assert!(!reloaded.ever_assignment_confirmed);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn clearing_workers_reverts_stage_only() {
        let fx = fixture().await;
        let order = fx.service.create_order(fx.input(1, 0, Some("Ana"))).await.unwrap().order;

        let updated = fx.service.assign_workers(order.id, " ; ").await.unwrap();
        assert_eq!(updated.stage, OrderStage::Creada);
        assert!(updated.assigned_workers.is_empty());
        assert!(updated.ever_assignment_confirmed);
    }

    // --- Recojo ---

    #[tokio::test]
    async fn pickup_generates_missing_placeholders() {
        let fx = fixture().await;
        let order = fx.service.create_order(fx.input(2, 2, None)).await.unwrap();
        let order_id = order.order.id;
        fx.service.assign_workers(order_id, "Juan Perez").await.unwrap();
        fx.service.confirm_assignment(order_id).await.unwrap();
        // Sem registros pré-existentes: só o detalhe tipo/capacidade sobra.
        for record in &order.extinguishers {
            fx.service.delete_extinguisher(order_id, record.id).await.unwrap();
        }

        let outcome = fx.service.set_picked_up(order_id, true).await.unwrap();

        assert_eq!(outcome.generated, 2);
        assert_eq!(outcome.total_extinguishers, 2);
        assert_eq!(outcome.stage, OrderStage::Recogido);
        assert!(outcome.is_first_time);
        let reloaded = fx.order(order_id).await;
        assert_eq!(reloaded.status, OrderStatus::InProgress);
        assert!(reloaded.picked_up_on.is_some());
        assert!(reloaded.ever_marked_picked_up);
    }

    #[tokio::test]
    async fn unpicking_keeps_filled_records_and_repicking_tops_up() {
        let fx = fixture().await;
        let detail = fx.service.create_order(fx.input(2, 2, Some("Ana"))).await.unwrap();
        let order_id = detail.order.id;
        let filled = detail.extinguishers[0].id;
        fx.service
            .update_extinguisher_cell(order_id, filled, ExtinguisherField::Serial, "A-1".into())
            .await
            .unwrap();
        fx.service.set_picked_up(order_id, true).await.unwrap();

        let down = fx.service.set_picked_up(order_id, false).await.unwrap();
        assert_eq!(down.removed, 1);
        assert_eq!(down.stage, OrderStage::Asignada);
        let remaining = fx.service.get_order(order_id).await.unwrap().extinguishers;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].serial, "A-1");
        assert!(fx.order(order_id).await.picked_up_on.is_none());

        let up = fx.service.set_picked_up(order_id, true).await.unwrap();
        assert_eq!(up.generated, 1);
        assert_eq!(up.total_extinguishers, 2);
        assert!(!up.is_first_time);
    }

    #[tokio::test]
    async fn failed_generation_rolls_back_the_stage_change() {
        let fx = fixture().await;
        let detail = fx.service.create_order(fx.input(2, 2, Some("Ana"))).await.unwrap();
        let order_id = detail.order.id;
        for record in &detail.extinguishers {
            fx.service.delete_extinguisher(order_id, record.id).await.unwrap();
        }
        let mut rx = fx.bus.subscribe();

        fx.store.set_fail_extinguisher_inserts(true).await;
        let err = fx.service.set_picked_up(order_id, true).await.unwrap_err();
        assert!(matches!(err, AppError::StorageError(_)));

        let reloaded = fx.order(order_id).await;
        assert_eq!(reloaded.stage, OrderStage::Asignada);
        assert!(!reloaded.picked_up);
        assert!(!reloaded.ever_marked_picked_up);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn pickup_broadcasts_exactly_once_after_commit() {
        let fx = fixture().await;
        let order = fx.service.create_order(fx.input(1, 1, Some("Ana"))).await.unwrap().order;
        let mut rx = fx.bus.subscribe();

        fx.service.set_picked_up(order.id, true).await.unwrap();

        let kinds = order_kinds(&drain(&mut rx));
        assert_eq!(kinds, vec!["recogido_actualizado"]);
    }

    // --- Revisão ---

    #[tokio::test]
    async fn review_cycle_and_monotonic_flags() {
        let fx = fixture().await;
        let id = fx.service.create_order(fx.input(1, 1, None)).await.unwrap().order.id;

        let check = |order: &Order, picked: bool, confirmed: bool, sent: bool| {
            assert_eq!(order.ever_marked_picked_up, picked);
            assert_eq!(order.ever_assignment_confirmed, confirmed);
            assert_eq!(order.sent_to_office, sent);
        };

        fx.service.assign_workers(id, "Ana").await.unwrap();
        fx.service.confirm_assignment(id).await.unwrap();
        check(&fx.order(id).await, false, true, false);

        fx.service.set_picked_up(id, true).await.unwrap();
        check(&fx.order(id).await, true, true, false);

        let sent = fx.service.send_to_review(id, Some("2026-03".into())).await.unwrap();
        assert!(sent.is_first_time);
        let first_sent_at = fx.order(id).await.sent_to_office_at;
        check(&fx.order(id).await, true, true, true);

        let finalized = fx.service.finalize_review(id).await.unwrap();
        assert_eq!(finalized.stage, OrderStage::Finalizado);
        assert_eq!(finalized.status, OrderStatus::Completed);
        assert!(finalized.review_finalized);

        // Mudanças depois da revisão reabrem, mas nada permanente volta a false.
        fx.service.set_picked_up(id, false).await.unwrap();
        fx.service.assign_workers(id, "").await.unwrap();
        check(&fx.order(id).await, true, true, true);

        fx.service.assign_workers(id, "Luis").await.unwrap();
        fx.service.confirm_assignment(id).await.unwrap();
        assert!(!fx.order(id).await.review_finalized);

        fx.service.finalize_review(id).await.unwrap();
        fx.service.set_picked_up(id, true).await.unwrap();
        assert!(!fx.order(id).await.review_finalized);

        fx.service.finalize_review(id).await.unwrap();
        let again = fx.service.send_to_review(id, None).await.unwrap();
        assert!(!again.is_first_time);
        let reloaded = fx.order(id).await;
        assert!(!reloaded.review_finalized);
        assert_eq!(reloaded.sent_to_office_at, first_sent_at);
        assert_eq!(reloaded.selected_recharge_date.as_deref(), Some("2026-03"));
        check(&reloaded, true, true, true);
    }

    #[tokio::test]
    async fn transitions_on_missing_orders_are_not_found() {
        let fx = fixture().await;
        assert!(matches!(fx.service.confirm_assignment(42).await, Err(AppError::NotFound(_))));
        assert!(matches!(fx.service.set_picked_up(42, true).await, Err(AppError::NotFound(_))));
        assert!(matches!(fx.service.finalize_review(42).await, Err(AppError::NotFound(_))));
        assert!(matches!(fx.service.delete_order(42).await, Err(AppError::NotFound(_))));
    }

    // --- Planilha ---

    #[tokio::test]
    async fn filling_serials_promotes_status() {
        let fx = fixture().await;
        let detail = fx.service.create_order(fx.input(2, 2, None)).await.unwrap();
        let id = detail.order.id;
        let mut rx = fx.bus.subscribe();

        fx.service
            .update_extinguisher_cell(id, detail.extinguishers[0].id, ExtinguisherField::Serial, "S-1".into())
            .await
            .unwrap();
        assert_eq!(fx.order(id).await.status, OrderStatus::InProgress);

        fx.service
            .update_extinguisher_cell(id, detail.extinguishers[1].id, ExtinguisherField::Serial, "S-2".into())
            .await
            .unwrap();
        assert_eq!(fx.order(id).await.status, OrderStatus::Completed);

        let events = drain(&mut rx);
        let last = events.last().unwrap();
        match last {
            RealtimeEvent::OrderChanged(event) => {
                assert_eq!(event.kind, "cell_updated");
                assert_eq!(event.payload["field"], "serial");
                assert_eq!(event.payload["value"], "S-2");
            }
            other => panic!("evento inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn deleting_a_filled_record_reopens_a_completed_order() {
        let fx = fixture().await;
        let detail = fx.service.create_order(fx.input(2, 2, None)).await.unwrap();
        let id = detail.order.id;
        for (i, record) in detail.extinguishers.iter().enumerate() {
            fx.service
                .update_extinguisher_cell(id, record.id, ExtinguisherField::Serial, format!("S-{i}"))
                .await
                .unwrap();
        }
        assert_eq!(fx.order(id).await.status, OrderStatus::Completed);
        let mut rx = fx.bus.subscribe();

        fx.service.delete_extinguisher(id, detail.extinguishers[0].id).await.unwrap();
        assert_eq!(fx.order(id).await.status, OrderStatus::InProgress);

        match drain(&mut rx).last().unwrap() {
            RealtimeEvent::OrderChanged(event) => {
                assert_eq!(event.kind, "extinguisher_removed");
                assert_eq!(event.payload["status"], serde_json::to_value(OrderStatus::InProgress).unwrap());
            }
            other => panic!("evento inesperado: {other:?}"),
        }

        fx.service.delete_extinguisher(id, detail.extinguishers[1].id).await.unwrap();
        assert_eq!(fx.order(id).await.status, OrderStatus::InProgress);
    }

    #[tokio::test]
    async fn deleting_a_blank_record_keeps_the_status() {
        let fx = fixture().await;
        let detail = fx.service.create_order(fx.input(1, 2, None)).await.unwrap();
        let id = detail.order.id;
        fx.service
            .add_extinguisher(
                id,
                NewExtinguisher {
                    serial: "Z-1".into(),
                    ..NewExtinguisher::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(fx.order(id).await.status, OrderStatus::Completed);

        fx.service.delete_extinguisher(id, detail.extinguishers[0].id).await.unwrap();
        assert_eq!(fx.order(id).await.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn cells_of_another_order_are_not_found() {
        let fx = fixture().await;
        let a = fx.service.create_order(fx.input(1, 1, None)).await.unwrap();
        let b = fx.service.create_order(fx.input(1, 1, None)).await.unwrap();

        let err = fx
            .service
            .update_extinguisher_cell(a.order.id, b.extinguishers[0].id, ExtinguisherField::Brand, "X".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = fx
            .service
            .delete_extinguisher(a.order.id, b.extinguishers[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn added_extinguishers_count_towards_status() {
        let fx = fixture().await;
        let order = fx.service.create_order(fx.input(1, 0, None)).await.unwrap().order;

        let record = fx
            .service
            .add_extinguisher(
                order.id,
                NewExtinguisher {
                    serial: "Z-9".into(),
                    brand: "Badger".into(),
                    ..NewExtinguisher::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.client_id, fx.client);
        assert_eq!(fx.order(order.id).await.status, OrderStatus::Completed);

        let summaries = fx.service.list_orders().await.unwrap();
        assert_eq!(summaries[0].registered_count, 1);
    }

    #[tokio::test]
    async fn recharge_date_must_not_be_blank() {
        let fx = fixture().await;
        let order = fx.service.create_order(fx.input(1, 0, None)).await.unwrap().order;

        assert!(matches!(
            fx.service.save_recharge_date(order.id, "  ").await,
            Err(AppError::ValidationError(_))
        ));
        let saved = fx.service.save_recharge_date(order.id, "2026-01").await.unwrap();
        assert_eq!(saved.selected_recharge_date.as_deref(), Some("2026-01"));
    }

    #[tokio::test]
    async fn info_update_changes_status_and_notes() {
        let fx = fixture().await;
        let order = fx.service.create_order(fx.input(1, 0, None)).await.unwrap().order;

        let updated = fx
            .service
            .update_order_info(order.id, Some(OrderStatus::InProgress), Some("Portón lateral".into()))
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::InProgress);
        assert_eq!(updated.notes, "Portón lateral");
        assert_eq!(updated.stage, OrderStage::Creada);
    }

    // --- Exclusão ---

    #[tokio::test]
    async fn delete_cascades_to_children_and_files() {
        let fx = fixture().await;
        let detail = fx.service.create_order(fx.input(2, 2, None)).await.unwrap();
        let id = detail.order.id;
        let path = format!("{}/foto_1.jpg", PhotoKind::Evidence.order_directory(id));
        fx.blobs.save(&path, b"jpeg").await.unwrap();
        {
            let mut tx = fx.store.begin().await.unwrap();
            tx.insert_photo(
                PhotoKind::Evidence,
                &NewPhoto {
                    order_id: id,
                    file_name: "foto_1.jpg".into(),
                    relative_path: path.clone(),
                    captured_at: Utc::now(),
                    size_bytes: 4,
                },
            )
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }
        let mut rx = fx.bus.subscribe();

        fx.service.delete_order(id).await.unwrap();

        let state = fx.store.snapshot().await;
        assert!(state.orders.is_empty());
        assert!(state.extinguishers.is_empty());
        assert!(state.evidence_photos.is_empty());
        assert!(state.line_details.is_empty());
        assert!(fx.blobs.paths().await.is_empty());
        assert_eq!(order_kinds(&drain(&mut rx)), vec!["order_deleted"]);
    }
}
