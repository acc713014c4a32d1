//! Session registry: authenticated identity → live connections.
//!
//! Holds the outbound queue handle for every authenticated connection.
//! An identity is present iff it has at least one live connection; the
//! entry disappears in the same operation that removes the last
//! connection, so readers never observe an identity with zero
//! connections.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::domain::{ConnectionId, RegistryError, ServerEvent, UserId};

use super::outbound::{OutboundQueue, PushError};

/// Result of unregistering a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnregisterOutcome {
    /// The identity's last connection closed
    WentOffline(UserId),
    /// Other connections of the same identity remain live
    StillOnline(UserId),
    /// The connection was never registered (e.g. anonymous)
    NotRegistered,
}

#[derive(Default)]
struct RegistryState {
    by_user: HashMap<UserId, HashMap<ConnectionId, OutboundQueue>>,
    by_connection: HashMap<ConnectionId, UserId>,
}

/// In-memory registry of live, authenticated connections.
///
/// All mutations happen under one lock, so every read sees a complete
/// entry or none at all.
#[derive(Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under an identity.
    ///
    /// Idempotent when the same connection is already registered to the
    /// same identity. Fails with `AlreadyRegistered` only when the
    /// connection id is owned by a *different* identity.
    pub async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        queue: OutboundQueue,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        if let Some(owner) = state.by_connection.get(&connection_id) {
            if *owner != user_id {
                return Err(RegistryError::AlreadyRegistered {
                    connection_id,
                    owner: owner.clone(),
                });
            }
            return Ok(());
        }
        state
            .by_connection
            .insert(connection_id, user_id.clone());
        state
            .by_user
            .entry(user_id.clone())
            .or_default()
            .insert(connection_id, queue);
        tracing::debug!(user_id = %user_id, connection_id = %connection_id, "connection registered");
        Ok(())
    }

    /// Remove a connection from whichever identity owns it.
    ///
    /// No-op (`NotRegistered`) for unknown connection ids.
    pub async fn unregister(&self, connection_id: ConnectionId) -> UnregisterOutcome {
        let mut state = self.state.lock().await;
        let Some(user_id) = state.by_connection.remove(&connection_id) else {
            return UnregisterOutcome::NotRegistered;
        };
        let went_offline = match state.by_user.get_mut(&user_id) {
            Some(connections) => {
                connections.remove(&connection_id);
                connections.is_empty()
            }
            None => true,
        };
        if went_offline {
            state.by_user.remove(&user_id);
        }
        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            went_offline,
            "connection unregistered"
        );
        if went_offline {
            UnregisterOutcome::WentOffline(user_id)
        } else {
            UnregisterOutcome::StillOnline(user_id)
        }
    }

    /// Live connection ids of an identity; empty if unknown
    pub async fn connections_for(&self, user_id: &UserId) -> HashSet<ConnectionId> {
        let state = self.state.lock().await;
        state
            .by_user
            .get(user_id)
            .map(|connections| connections.keys().copied().collect())
            .unwrap_or_default()
    }

    pub async fn is_online(&self, user_id: &UserId) -> bool {
        let state = self.state.lock().await;
        state.by_user.contains_key(user_id)
    }

    /// Identities currently online, with their live connection ids
    pub async fn snapshot(&self) -> HashMap<UserId, HashSet<ConnectionId>> {
        let state = self.state.lock().await;
        state
            .by_user
            .iter()
            .map(|(user, connections)| (user.clone(), connections.keys().copied().collect()))
            .collect()
    }

    /// Enqueue an event to each target connection, non-blocking.
    ///
    /// A target whose queue is already closed is skipped. Returns the
    /// connections that overflowed on this event (their queues are now
    /// closed with `SlowConsumer`); delivery to the remaining targets is
    /// unaffected.
    pub async fn push_to(
        &self,
        targets: &HashSet<ConnectionId>,
        event: ServerEvent,
    ) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        let mut overflowed = Vec::new();
        for connection_id in targets {
            let Some(user_id) = state.by_connection.get(connection_id) else {
                continue;
            };
            let Some(queue) = state
                .by_user
                .get(user_id)
                .and_then(|connections| connections.get(connection_id))
            else {
                continue;
            };
            match queue.push(event.clone()).await {
                Ok(()) => {}
                Err(PushError::Closed) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "skipping delivery to closed outbound queue"
                    );
                }
                Err(PushError::Overflow) => {
                    tracing::warn!(
                        user_id = %user_id,
                        connection_id = %connection_id,
                        "outbound queue overflowed, closing slow consumer"
                    );
                    overflowed.push(*connection_id);
                }
            }
        }
        overflowed
    }
}
