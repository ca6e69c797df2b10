//! Delivery router: the identity -> live connections registry.
//!
//! Owns every room. Constructed once at startup and handed to each
//! component through `AppContext`; there is no ambient global registry.
//! Delivery is best-effort: an identity with no live connections simply
//! receives nothing, durability lives in the message store.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::message::ServerEvent;
use crate::utils::log_safe_id;

/// Identifies one live connection within a room.
pub type ConnectionId = Uuid;

type Rooms = HashMap<Uuid, HashMap<ConnectionId, UnboundedSender<ServerEvent>>>;

pub struct DeliveryRouter {
    rooms: RwLock<Rooms>,
    hash_salt: String,
}

impl DeliveryRouter {
    pub fn new(hash_salt: impl Into<String>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            hash_salt: hash_salt.into(),
        }
    }

    /// Registers a connection in the room of `claimed`.
    ///
    /// A connection may only ever join the room of the identity it
    /// authenticated as; a mismatched claim is a logged no-op so an
    /// impersonation attempt learns nothing. Returns whether the join
    /// happened.
    pub async fn join(
        &self,
        connection: ConnectionId,
        claimed: Uuid,
        authenticated: Uuid,
        tx: UnboundedSender<ServerEvent>,
    ) -> bool {
        if claimed != authenticated {
            tracing::warn!(
                connection = %connection,
                claimed_hash = %log_safe_id(&claimed.to_string(), &self.hash_salt),
                "Join refused: claimed identity does not match connection identity"
            );
            return false;
        }

        self.rooms
            .write()
            .await
            .entry(authenticated)
            .or_default()
            .insert(connection, tx);

        tracing::debug!(connection = %connection, "Connection joined its room");
        true
    }

    /// Fans `event` out to every live connection of `target`.
    ///
    /// Returns the number of connections the event was handed to. Zero is
    /// not an error; there is no queue and no retry.
    pub async fn publish(&self, target: Uuid, event: ServerEvent) -> usize {
        let rooms = self.rooms.read().await;
        let Some(room) = rooms.get(&target) else {
            return 0;
        };

        let mut delivered = 0;
        for (connection, tx) in room {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                // Receiver task already gone; leave() will reap it.
                tracing::debug!(connection = %connection, "Dropping event for closed connection");
            }
        }
        delivered
    }

    /// Removes a connection from its identity's room, dropping the room
    /// once it is empty.
    pub async fn leave(&self, identity: Uuid, connection: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(&identity) {
            room.remove(&connection);
            if room.is_empty() {
                rooms.remove(&identity);
            }
        }
    }

    /// Number of live connections for an identity.
    pub async fn connection_count(&self, identity: Uuid) -> usize {
        self.rooms
            .read()
            .await
            .get(&identity)
            .map(|room| room.len())
            .unwrap_or(0)
    }
}
