//! Room membership and fan-out to connected sockets.
//!
//! Each connection owns an unbounded channel drained by its socket writer.
//! Nothing here is persisted; membership disappears with the connection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::events::ServerEvent;

/// Identifier handed out to each socket on registration.
pub type ConnectionId = u64;

#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

/// Shared registry of connections and the rooms they have joined.
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    inner: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a connection and returns its id and outbound queue.
    #[instrument(skip(self))]
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().connections.insert(id, tx);
        info!(connection_id = id, "Connection registered");
        (id, rx)
    }

    /// Drops a connection and every room membership it held.
    #[instrument(skip(self))]
    pub fn unregister(&self, id: ConnectionId) {
        let mut registry = self.lock();
        registry.connections.remove(&id);
        registry.rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
        info!(connection_id = id, "Connection unregistered");
    }

    /// Adds a connection to a room. Joining twice is harmless.
    #[instrument(skip(self))]
    pub fn join(&self, id: ConnectionId, room: &str) {
        let mut registry = self.lock();
        if !registry.connections.contains_key(&id) {
            warn!(connection_id = id, room, "Unknown connection tried to join room");
            return;
        }
        registry.rooms.entry(room.to_string()).or_default().insert(id);
        debug!(connection_id = id, room, "Joined room");
    }

    /// Removes a connection from a room.
    #[instrument(skip(self))]
    pub fn leave(&self, id: ConnectionId, room: &str) {
        let mut registry = self.lock();
        if let Some(members) = registry.rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                registry.rooms.remove(room);
            }
        }
        debug!(connection_id = id, room, "Left room");
    }

    /// Whether the connection is currently in the room.
    #[instrument(skip(self))]
    pub fn is_member(&self, id: ConnectionId, room: &str) -> bool {
        self.lock()
            .rooms
            .get(room)
            .is_some_and(|members| members.contains(&id))
    }

    /// Number of connections in a room.
    #[instrument(skip(self))]
    pub fn member_count(&self, room: &str) -> usize {
        self.lock().rooms.get(room).map_or(0, HashSet::len)
    }

    /// Sends an event to every member of a room and returns how many
    /// queues accepted it.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn broadcast(&self, room: &str, event: ServerEvent) -> usize {
        let registry = self.lock();
        let Some(members) = registry.rooms.get(room) else {
            debug!(room, "Broadcast to empty room");
            return 0;
        };
        let delivered = members
            .iter()
            .filter_map(|id| registry.connections.get(id))
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count();
        debug!(room, delivered, "Broadcast to room");
        delivered
    }

    /// Sends an event to one connection.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) -> bool {
        let sent = self
            .lock()
            .connections
            .get(&id)
            .is_some_and(|tx| tx.send(event).is_ok());
        if !sent {
            debug!(connection_id = id, "Connection gone, event dropped");
        }
        sent
    }

    /// Sends an event to every registered connection.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn broadcast_all(&self, event: ServerEvent) -> usize {
        let registry = self.lock();
        let delivered = registry
            .connections
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count();
        debug!(delivered, "Broadcast to all connections");
        delivered
    }
}
