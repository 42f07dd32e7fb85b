use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::db::HistoryStore;
use crate::rooms::actor::{ClientSnapshot, RoomActor, RoomConfig};
use crate::rooms::id::RoomId;

/// Transport handle for one registered client: the actor pushes frames here,
/// the connection's writer task drains them onto the socket.
pub type ClientSender = mpsc::UnboundedSender<Message>;

pub enum RoomCommand {
    Join {
        sender: ClientSender,
        reply: oneshot::Sender<Uuid>,
    },
    Frame {
        client_id: Uuid,
        payload: Bytes,
    },
    Disconnect {
        client_id: Uuid,
    },
    Roster {
        reply: oneshot::Sender<Vec<ClientSnapshot>>,
    },
}

/// Cloneable address of one room actor.
#[derive(Clone)]
pub struct RoomHandle {
    commands: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn spawn(room_id: RoomId, store: HistoryStore, config: RoomConfig) -> Self {
        let (commands, mailbox) = mpsc::unbounded_channel();
        tokio::spawn(RoomActor::new(room_id, store, config).run(mailbox));
        Self { commands }
    }

    /// Register a transport with the room; returns the issued client token.
    pub async fn join(&self, sender: ClientSender) -> Option<Uuid> {
        let (reply, issued) = oneshot::channel();
        self.commands.send(RoomCommand::Join { sender, reply }).ok()?;
        issued.await.ok()
    }

    pub fn frame(&self, client_id: Uuid, payload: Bytes) {
        let _ = self.commands.send(RoomCommand::Frame { client_id, payload });
    }

    pub fn disconnect(&self, client_id: Uuid) {
        let _ = self.commands.send(RoomCommand::Disconnect { client_id });
    }

    pub async fn roster(&self) -> Vec<ClientSnapshot> {
        let (reply, snapshot) = oneshot::channel();
        if self.commands.send(RoomCommand::Roster { reply }).is_err() {
            return Vec::new();
        }
        snapshot.await.unwrap_or_default()
    }
}

/// One addressable stateful unit per room, created or resumed on first use.
///
/// The map is sharded, so traffic for unrelated rooms never contends on a
/// common lock; each entry only hands out mailbox senders.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomId, RoomHandle>>,
    store: HistoryStore,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(store: HistoryStore, config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            store,
            config,
        }
    }

    pub fn room(&self, room_id: &RoomId) -> RoomHandle {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::debug!(room = %room_id, "spawning room actor");
                RoomHandle::spawn(room_id.clone(), self.store.clone(), self.config.clone())
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::db;

    use super::*;

    async fn test_registry() -> RoomRegistry {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init(&db_pool).await.unwrap();
        RoomRegistry::new(HistoryStore::new(db_pool), RoomConfig::default())
    }

    #[tokio::test]
    async fn the_same_id_resumes_the_same_actor() {
        let registry = test_registry().await;
        let room_id = RoomId::resolve("lobby").unwrap();

        let (sender, _rx) = mpsc::unbounded_channel();
        registry.room(&room_id).join(sender).await.unwrap();

        // a second lookup addresses the actor that already holds the client
        let roster = registry.room(&room_id).roster().await;
        assert_eq!(roster.len(), 1);
    }

    #[tokio::test]
    async fn different_rooms_are_isolated() {
        let registry = test_registry().await;
        let lobby = RoomId::resolve("lobby").unwrap();
        let other = RoomId::resolve("other").unwrap();

        let (sender, _rx) = mpsc::unbounded_channel();
        registry.room(&lobby).join(sender).await.unwrap();

        assert!(registry.room(&other).roster().await.is_empty());
    }
}
