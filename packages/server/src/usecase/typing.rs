//! Typing indicators.
//!
//! Ephemeral per-connection state, never persisted. An indicator clears
//! on the next message from the same connection, on an explicit stop, or
//! when the connection goes away.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{ConnectionId, RoomId, ServerEvent, UserId};
use crate::realtime::{RoomMembershipIndex, SessionRegistry};

use super::error::TypingError;

struct TypingEntry {
    user_id: UserId,
    rooms: HashSet<RoomId>,
}

/// Tracks which connections are typing in which rooms and relays
/// start/stop events to the other participants' live connections.
pub struct TypingTracker {
    rooms: Arc<RoomMembershipIndex>,
    registry: Arc<SessionRegistry>,
    state: Mutex<HashMap<ConnectionId, TypingEntry>>,
}

impl TypingTracker {
    pub fn new(rooms: Arc<RoomMembershipIndex>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            rooms,
            registry,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// A connection started typing in a room.
    ///
    /// Requires room participation. Repeated starts without a stop are
    /// collapsed into one event.
    pub async fn start(
        &self,
        connection_id: ConnectionId,
        user_id: &UserId,
        room_id: &RoomId,
    ) -> Result<(), TypingError> {
        if !self.rooms.is_participant(room_id, user_id).await? {
            return Err(TypingError::Forbidden);
        }
        let newly_started = {
            let mut state = self.state.lock().await;
            state
                .entry(connection_id)
                .or_insert_with(|| TypingEntry {
                    user_id: user_id.clone(),
                    rooms: HashSet::new(),
                })
                .rooms
                .insert(room_id.clone())
        };
        if newly_started {
            self.relay(
                connection_id,
                room_id,
                ServerEvent::TypingStarted {
                    user_id: user_id.clone(),
                    room_id: room_id.clone(),
                },
            )
            .await;
        }
        Ok(())
    }

    /// A connection stopped typing in a room (explicit stop or a message
    /// was sent). No-op if it was not typing there.
    pub async fn stop(&self, connection_id: ConnectionId, room_id: &RoomId) {
        let stopped_user = {
            let mut state = self.state.lock().await;
            match state.get_mut(&connection_id) {
                Some(entry) if entry.rooms.contains(room_id) => {
                    entry.rooms.remove(room_id);
                    let user_id = entry.user_id.clone();
                    if entry.rooms.is_empty() {
                        state.remove(&connection_id);
                    }
                    Some(user_id)
                }
                _ => None,
            }
        };
        if let Some(user_id) = stopped_user {
            self.relay(
                connection_id,
                room_id,
                ServerEvent::TypingStopped {
                    user_id,
                    room_id: room_id.clone(),
                },
            )
            .await;
        }
    }

    /// Clear every indicator a disconnecting connection left behind,
    /// notifying each affected room.
    pub async fn clear_connection(&self, connection_id: ConnectionId) {
        let entry = {
            let mut state = self.state.lock().await;
            state.remove(&connection_id)
        };
        let Some(entry) = entry else {
            return;
        };
        for room_id in &entry.rooms {
            self.relay(
                connection_id,
                room_id,
                ServerEvent::TypingStopped {
                    user_id: entry.user_id.clone(),
                    room_id: room_id.clone(),
                },
            )
            .await;
        }
    }

    /// Send a typing event to the room's live connections, excluding the
    /// originating connection
    async fn relay(&self, origin: ConnectionId, room_id: &RoomId, event: ServerEvent) {
        let mut targets = match self.rooms.live_connections_for(room_id).await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::warn!(
                    room_id = %room_id,
                    error = %e,
                    "failed to resolve live connections for typing relay"
                );
                return;
            }
        };
        targets.remove(&origin);
        if !targets.is_empty() {
            self.registry.push_to(&targets, event).await;
        }
    }
}
