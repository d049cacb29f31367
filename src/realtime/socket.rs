// src/realtime/socket.rs

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    bus::{NotificationBus, RealtimeEvent},
    presence::PresenceTracker,
};
use crate::{common::error::AppError, config::AppState};

// --- Mensagens do cliente ---

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Identify {
        name: Option<String>,
        role: Option<String>,
    },
    Activity {
        user: Option<String>,
        action: Option<String>,
        page: Option<String>,
        details: Option<String>,
    },
    CellEdited {
        order_id: i64,
        extinguisher_id: i64,
        field: String,
        value: Value,
        user: Option<String>,
    },
    FieldEdited {
        field_id: String,
        value: Value,
        user: Option<String>,
    },
    RechargeDateChanged {
        order_id: i64,
        date: String,
    },
    JoinOrder {
        order_id: i64,
    },
    Ping,
}

// Respostas diretas a uma única conexão (não passam pelo barramento).
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerReply {
    Connected { connection_id: Uuid },
    Pong,
    Error { message: String },
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

// GET /ws?token=...
// O navegador não manda cabeçalho Authorization no upgrade, então o token vem na query.
pub async fn ws_handler(
    State(app_state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let token = params.token.ok_or(AppError::InvalidToken)?;
    let user = app_state.auth_service.validate_token(&token).await?;
    tracing::debug!("Upgrade de WebSocket autorizado para {}", user.username);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, app_state)))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    if let Ok(json) = serde_json::to_string(&ServerReply::Connected { connection_id }) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    let mut event_rx = app_state.bus.subscribe();
    tracing::info!(
        "✅ [SYNC] Conexão em tempo real aberta: {} ({} assinantes)",
        connection_id,
        app_state.bus.subscriber_count()
    );

    loop {
        tokio::select! {
            // Mensagens do cliente
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(message) => {
                                handle_client_message(message, connection_id, &app_state.presence, &app_state.bus).await
                            }
                            Err(e) => Some(ServerReply::Error {
                                message: format!("Mensagem inválida: {}", e),
                            }),
                        };
                        if let Some(reply) = reply {
                            if let Ok(json) = serde_json::to_string(&reply) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!("Erro no WebSocket {}: {}", connection_id, e);
                        break;
                    }
                    _ => {}
                }
            }
            // Eventos do barramento
            event = event_rx.recv() => {
                match event {
                    Ok(envelope) => {
                        if !envelope.is_for(connection_id) {
                            continue;
                        }
                        if let Ok(json) = serde_json::to_string(&envelope.event) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Conexão {} perdeu {} eventos (lagged)", connection_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    app_state.presence.disconnect(connection_id).await;
    tracing::info!("❌ [SYNC] Conexão em tempo real encerrada: {}", connection_id);
}

/// Aplica uma mensagem do cliente. Edições ao vivo não passam pelo banco:
/// vão direto para os outros pares, nunca de volta para a origem.
pub async fn handle_client_message(
    message: ClientMessage,
    connection_id: Uuid,
    presence: &PresenceTracker,
    bus: &NotificationBus,
) -> Option<ServerReply> {
    match message {
        ClientMessage::Identify { name, role } => {
            presence.identify(connection_id, name, role).await;
            None
        }
        ClientMessage::Activity { user, action, page, details } => {
            presence.activity(user, action, page, details);
            None
        }
        ClientMessage::CellEdited { order_id, extinguisher_id, field, value, user } => {
            tracing::info!(
                "📝 [CELDA-SYNC] {}: {} = {}",
                user.as_deref().unwrap_or("Usuario"),
                field,
                value
            );
            bus.publish_except(
                RealtimeEvent::CellUpdated {
                    order_id,
                    extinguisher_id,
                    field,
                    value,
                    user,
                    timestamp: Utc::now(),
                },
                connection_id,
            );
            None
        }
        ClientMessage::FieldEdited { field_id, value, user } => {
            tracing::info!(
                "📝 [CAMPO-SYNC] {}: {} = {}",
                user.as_deref().unwrap_or("Usuario"),
                field_id,
                value
            );
            bus.publish_except(
                RealtimeEvent::FieldUpdated {
                    field_id,
                    value,
                    user,
                    timestamp: Utc::now(),
                },
                connection_id,
            );
            None
        }
        ClientMessage::RechargeDateChanged { order_id, date } => {
            tracing::info!("📅 [FECHA-RECARGA] Ordem {}: {}", order_id, date);
            bus.publish_except(RealtimeEvent::RechargeDateChanged { order_id, date }, connection_id);
            None
        }
        ClientMessage::JoinOrder { order_id } => {
            // Todos recebem todos os eventos de ordem; a sala fica só registrada no log.
            tracing::info!("📱 [SYNC] Conexão {} entrou na ordem {}", connection_id, order_id);
            None
        }
        ClientMessage::Ping => Some(ServerReply::Pong),
    }
}
