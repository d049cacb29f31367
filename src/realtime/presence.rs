// src/realtime/presence.rs

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::bus::{NotificationBus, RealtimeEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub name: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// Quem está conectado agora. Vive só na memória do processo: começa vazio,
/// muda apenas por identify/disconnect e é limpo no desligamento.
pub struct PresenceTracker {
    users: RwLock<HashMap<Uuid, PresenceEntry>>,
    bus: NotificationBus,
}

impl PresenceTracker {
    pub fn new(bus: NotificationBus) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            bus,
        }
    }

    /// Registra (ou renomeia) a conexão e avisa todos com a nova contagem.
    pub async fn identify(&self, connection: Uuid, name: Option<String>, role: Option<String>) -> usize {
        let entry = PresenceEntry {
            name: name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| "Usuario".into()),
            role: role.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| "Usuario".into()),
            joined_at: Utc::now(),
        };

        let online_count = {
            let mut users = self.users.write().await;
            users.insert(connection, entry.clone());
            users.len()
        };

        tracing::info!("👤 [ATIVIDADE] {} conectou ({} online)", entry.name, online_count);
        self.bus.publish(RealtimeEvent::UserJoined {
            user: entry.name,
            role: entry.role,
            online_count,
            timestamp: Utc::now(),
        });
        online_count
    }

    /// Remove a conexão. O aviso de saída usa o nome registrado, nunca o id.
    pub async fn disconnect(&self, connection: Uuid) -> Option<PresenceEntry> {
        let removed = self.users.write().await.remove(&connection);

        if let Some(entry) = &removed {
            tracing::info!("❌ [ATIVIDADE] {} desconectou", entry.name);
            self.bus.publish(RealtimeEvent::UserLeft {
                user: entry.name.clone(),
                timestamp: Utc::now(),
            });
        }
        removed
    }

    pub fn activity(&self, user: Option<String>, action: Option<String>, page: Option<String>, details: Option<String>) {
        let user = user.unwrap_or_else(|| "Usuario".into());
        let action = action.unwrap_or_else(|| "realizou uma ação".into());
        tracing::info!("🔔 [ATIVIDADE] {}: {}", user, action);
        self.bus.publish(RealtimeEvent::Activity {
            user,
            action,
            page: page.unwrap_or_default(),
            details: details.unwrap_or_default(),
            timestamp: Utc::now(),
        });
    }

    pub async fn online_count(&self) -> usize {
        self.users.read().await.len()
    }

    #[cfg(test)]
    pub async fn get(&self, connection: Uuid) -> Option<PresenceEntry> {
        self.users.read().await.get(&connection).cloned()
    }

    pub async fn clear(&self) {
        let mut users = self.users.write().await;
        let dropped = users.len();
        users.clear();
        tracing::info!("🧹 Presença limpa ({} conexões)", dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identify_broadcasts_name_role_and_count() {
        let bus = NotificationBus::new(8);
        let mut rx = bus.subscribe();
        let presence = PresenceTracker::new(bus);

        presence.identify(Uuid::new_v4(), Some("Ana".into()), Some("TECNICO".into())).await;
        let count = presence.identify(Uuid::new_v4(), Some("Luis".into()), None).await;
        assert_eq!(count, 2);

        let _first = rx.recv().await.unwrap();
        match rx.recv().await.unwrap().event {
            RealtimeEvent::UserJoined { user, role, online_count, .. } => {
                assert_eq!(user, "Luis");
                assert_eq!(role, "Usuario");
                assert_eq!(online_count, 2);
            }
            other => panic!("evento inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn disconnect_announces_the_recorded_name() {
        let bus = NotificationBus::new(8);
        let presence = PresenceTracker::new(bus.clone());
        let connection = Uuid::new_v4();
        presence.identify(connection, Some("Ana".into()), None).await;

        let mut rx = bus.subscribe();
        let removed = presence.disconnect(connection).await.unwrap();
        assert_eq!(removed.name, "Ana");
        assert_eq!(presence.online_count().await, 0);

        match rx.recv().await.unwrap().event {
            RealtimeEvent::UserLeft { user, .. } => assert_eq!(user, "Ana"),
            other => panic!("evento inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_connections_leave_silently() {
        let bus = NotificationBus::new(8);
        let mut rx = bus.subscribe();
        let presence = PresenceTracker::new(bus);

        assert!(presence.disconnect(Uuid::new_v4()).await.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn clear_forgets_everyone() {
        let presence = PresenceTracker::new(NotificationBus::new(8));
        presence.identify(Uuid::new_v4(), Some("Ana".into()), None).await;
        presence.identify(Uuid::new_v4(), Some("Luis".into()), None).await;

        presence.clear().await;
        assert_eq!(presence.online_count().await, 0);
    }
}
