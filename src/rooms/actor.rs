use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::ws::Message;
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::db::HistoryStore;
use crate::rooms::history::HistoryBuffer;
use crate::rooms::id::RoomId;
use crate::rooms::registry::{ClientSender, RoomCommand};
use crate::rooms::wire::{ClientFrame, FrameKind, WireMessage};

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub history_capacity: usize,
    pub idle_timeout: Duration,
    pub reap_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            idle_timeout: Duration::from_secs(30 * 60),
            reap_interval: Duration::from_secs(5 * 60),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

struct ClientInfo {
    joined_at: OffsetDateTime,
    last_active: Instant,
    messages_sent: u64,
}

impl ClientInfo {
    fn now() -> Self {
        Self {
            joined_at: OffsetDateTime::now_utc(),
            last_active: Instant::now(),
            messages_sent: 0,
        }
    }
}

/// Point-in-time view of one registered client, for diagnostics and tests.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    pub client_id: Uuid,
    pub joined_at: OffsetDateTime,
    pub messages_sent: u64,
    pub idle: Duration,
}

struct ClientEntry {
    sender: ClientSender,
    info: ClientInfo,
}

/// Sole owner of one room's connection registry and history buffer.
///
/// Every mutation goes through the mailbox, and the reaper and heartbeat
/// timers are arms of the same `select!` loop, so registry access is
/// serialized without a lock. Rooms run as independent tasks.
pub(crate) struct RoomActor {
    room_id: RoomId,
    config: RoomConfig,
    store: HistoryStore,
    clients: HashMap<Uuid, ClientEntry>,
    history: HistoryBuffer,
}

impl RoomActor {
    pub(crate) fn new(room_id: RoomId, store: HistoryStore, config: RoomConfig) -> Self {
        Self {
            room_id,
            config,
            store,
            clients: HashMap::new(),
            history: HistoryBuffer::default(),
        }
    }

    pub(crate) async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<RoomCommand>) {
        // a recreated actor picks its buffer back up before the first command
        match self.store.get(&self.room_id).await {
            Ok(Some(buffer)) => self.history = buffer,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(room = %self.room_id, error = ?err, "failed to load history");
            }
        }

        let mut reaper = tokio::time::interval(self.config.reap_interval);
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        // both fire once immediately
        reaper.tick().await;
        heartbeat.tick().await;

        loop {
            tokio::select! {
                command = mailbox.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = reaper.tick() => self.sweep_idle(),
                _ = heartbeat.tick() => self.send_heartbeats(),
            }
        }

        tracing::debug!(room = %self.room_id, "room actor stopped");
    }

    async fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join { sender, reply } => self.handle_join(sender, reply),
            RoomCommand::Frame { client_id, payload } => {
                self.handle_frame(client_id, &payload).await;
            }
            RoomCommand::Disconnect { client_id } => self.handle_disconnect(client_id),
            RoomCommand::Roster { reply } => {
                let _ = reply.send(self.roster());
            }
        }
    }

    fn handle_join(&mut self, sender: ClientSender, reply: oneshot::Sender<Uuid>) {
        let client_id = Uuid::now_v7();

        // replay the rolling window before any live message can arrive
        for message in self.history.iter() {
            if let Ok(payload) = serde_json::to_string(message) {
                let _ = sender.send(Message::Text(payload.into()));
            }
        }

        self.clients.insert(
            client_id,
            ClientEntry {
                sender,
                info: ClientInfo::now(),
            },
        );
        tracing::info!(
            room = %self.room_id,
            client = %client_id,
            clients = self.clients.len(),
            "client joined"
        );
        let _ = reply.send(client_id);
    }

    async fn handle_frame(&mut self, client_id: Uuid, payload: &[u8]) {
        // frames racing a removal are dropped; the connection is terminal
        if !self.clients.contains_key(&client_id) {
            return;
        }

        let frame: ClientFrame = match serde_json::from_slice(payload) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(
                    room = %self.room_id,
                    client = %client_id,
                    error = %err,
                    "unparseable frame"
                );
                let reply = WireMessage::error(client_id, "error processing your message".to_owned());
                self.send_to(client_id, &reply);
                return;
            }
        };

        if let Some(entry) = self.clients.get_mut(&client_id) {
            entry.info.messages_sent += 1;
            entry.info.last_active = Instant::now();
        }

        if frame.kind == FrameKind::Leave {
            let who = frame.sender.unwrap_or_else(|| client_id.to_string());
            if self.remove_client(client_id, true) {
                tracing::info!(room = %self.room_id, client = %client_id, "client left");
                let notice =
                    WireMessage::leave_notice(client_id, format!("client {who} left the chat"));
                self.broadcast(&notice, Some(client_id));
            }
            return;
        }

        // every other tagged frame is stored and fanned out as a chat message
        let message = WireMessage::chat(client_id, frame.sender, frame.avatar, frame.data);
        let capacity = self.config.history_capacity;
        let stored = {
            let message = message.clone();
            self.store
                .transactional_update(&self.room_id, move |mut buffer| {
                    buffer.push(message, capacity);
                    buffer
                })
                .await
        };

        match stored {
            Ok(committed) => {
                self.history = committed;
                self.broadcast(&message, None);
            }
            Err(err) => {
                // fail closed: an unstored message must not become visible
                tracing::warn!(room = %self.room_id, error = ?err, "failed to persist message");
                let reply = WireMessage::error(client_id, "message could not be stored".to_owned());
                self.send_to(client_id, &reply);
            }
        }
    }

    /// Transport closed without a leave frame: drop the registration quietly.
    fn handle_disconnect(&mut self, client_id: Uuid) {
        if self.remove_client(client_id, false) {
            tracing::info!(room = %self.room_id, client = %client_id, "client disconnected");
        }
    }

    fn sweep_idle(&mut self) {
        let now = Instant::now();
        let idle: Vec<Uuid> = self
            .clients
            .iter()
            .filter(|(_, entry)| {
                now.duration_since(entry.info.last_active) > self.config.idle_timeout
            })
            .map(|(client_id, _)| *client_id)
            .collect();

        for client_id in idle {
            tracing::info!(room = %self.room_id, client = %client_id, "reaping idle client");
            self.remove_client(client_id, true);
            let notice =
                WireMessage::leave_notice(client_id, format!("client {client_id} timed out"));
            self.broadcast(&notice, None);
        }
    }

    fn send_heartbeats(&mut self) {
        if self.clients.is_empty() {
            return;
        }
        self.broadcast(&WireMessage::heartbeat(), None);
    }

    fn broadcast(&mut self, message: &WireMessage, exclude: Option<Uuid>) {
        let Ok(payload) = serde_json::to_string(message) else {
            return;
        };

        let mut dead = Vec::new();
        for (client_id, entry) in &self.clients {
            if Some(*client_id) == exclude {
                continue;
            }
            if entry.sender.send(Message::Text(payload.clone().into())).is_err() {
                dead.push(*client_id);
            }
        }

        // a failed send is an implicit disconnect, isolated to that client
        for client_id in dead {
            tracing::debug!(room = %self.room_id, client = %client_id, "dropping unreachable client");
            self.clients.remove(&client_id);
        }
    }

    fn send_to(&mut self, client_id: Uuid, message: &WireMessage) {
        let Ok(payload) = serde_json::to_string(message) else {
            return;
        };
        let Some(entry) = self.clients.get(&client_id) else {
            return;
        };
        let dead = entry.sender.send(Message::Text(payload.into())).is_err();
        if dead {
            self.clients.remove(&client_id);
        }
    }

    fn remove_client(&mut self, client_id: Uuid, close: bool) -> bool {
        match self.clients.remove(&client_id) {
            Some(entry) => {
                if close {
                    let _ = entry.sender.send(Message::Close(None));
                }
                true
            }
            None => false,
        }
    }

    fn roster(&self) -> Vec<ClientSnapshot> {
        let now = Instant::now();
        self.clients
            .iter()
            .map(|(client_id, entry)| ClientSnapshot {
                client_id: *client_id,
                joined_at: entry.info.joined_at,
                messages_sent: entry.info.messages_sent,
                idle: now.duration_since(entry.info.last_active),
            })
            .collect()
    }
}
