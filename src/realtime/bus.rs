// src/realtime/bus.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

// --- Tipos de evento ---

/// Evento ligado ao ciclo de vida de uma ordem.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub order_id: i64,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityChange {
    Created,
    Updated,
    Deleted,
}

impl EntityChange {
    fn label(&self) -> &'static str {
        match self {
            EntityChange::Created => "criado",
            EntityChange::Updated => "atualizado",
            EntityChange::Deleted => "removido",
        }
    }
}

/// Evento global de CRUD, com mensagem pronta para o toast da interface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEvent {
    pub entity: String,
    pub kind: EntityChange,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    pub message: String,
}

/// Tudo o que trafega pelo barramento até as conexões em tempo real.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RealtimeEvent {
    OrderChanged(OrderEvent),
    DataChanged(EntityEvent),
    CellUpdated {
        order_id: i64,
        extinguisher_id: i64,
        field: String,
        value: Value,
        user: Option<String>,
        timestamp: DateTime<Utc>,
    },
    FieldUpdated {
        field_id: String,
        value: Value,
        user: Option<String>,
        timestamp: DateTime<Utc>,
    },
    RechargeDateChanged {
        order_id: i64,
        date: String,
    },
    UserJoined {
        user: String,
        role: String,
        online_count: usize,
        timestamp: DateTime<Utc>,
    },
    UserLeft {
        user: String,
        timestamp: DateTime<Utc>,
    },
    Activity {
        user: String,
        action: String,
        page: String,
        details: String,
        timestamp: DateTime<Utc>,
    },
}

/// Evento + a conexão que não deve recebê-lo (edições ao vivo não voltam para quem as fez).
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: RealtimeEvent,
    pub exclude: Option<Uuid>,
}

impl Envelope {
    pub fn is_for(&self, connection: Uuid) -> bool {
        self.exclude != Some(connection)
    }
}

// --- Barramento ---

/// Broadcast em processo, melhor esforço, no máximo uma entrega.
///
/// Quem se inscreve depois de um evento nunca o recebe, e um assinante lento
/// perde eventos (lagged) em vez de travar quem publica.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Envelope>,
}

impl NotificationBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publica para todos. Nunca falha: devolve quantos assinantes receberam.
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        self.send(Envelope { event, exclude: None })
    }

    /// Publica para todos, menos a conexão de origem.
    pub fn publish_except(&self, event: RealtimeEvent, origin: Uuid) -> usize {
        self.send(Envelope {
            event,
            exclude: Some(origin),
        })
    }

    pub fn publish_order(&self, order_id: i64, kind: &str, payload: Value) -> usize {
        let delivered = self.publish(RealtimeEvent::OrderChanged(OrderEvent {
            order_id,
            kind: kind.to_string(),
            timestamp: Utc::now(),
            payload,
        }));
        tracing::info!("🔄 [SYNC] {} - ordem {} ({} conexões)", kind, order_id, delivered);
        delivered
    }

    /// `message = None` gera a mensagem padrão "<entidade> <ação>".
    pub fn publish_entity(
        &self,
        entity: &str,
        kind: EntityChange,
        payload: Value,
        message: Option<String>,
    ) -> usize {
        let message = message.unwrap_or_else(|| format!("{} {}", entity, kind.label()));
        let delivered = self.publish(RealtimeEvent::DataChanged(EntityEvent {
            entity: entity.to_string(),
            kind,
            timestamp: Utc::now(),
            payload,
            message,
        }));
        tracing::info!("🔄 [GLOBAL-SYNC] {} {:?}", entity, kind);
        delivered
    }

    fn send(&self, envelope: Envelope) -> usize {
        // send() só falha quando não há nenhum assinante; isso não é erro do chamador.
        match self.sender.send(envelope) {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::debug!("Nenhuma conexão em tempo real para receber o evento");
                0
            }
        }
    }
}
