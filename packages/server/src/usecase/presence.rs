//! Presence tracking.
//!
//! Derives online/away/offline transitions from registry events and
//! explicit idle signals, persists every transition through the storage
//! collaborator, and notifies only the live connections of *other*
//! participants that share at least one room with the identity. Idle
//! detection itself is external policy; callers invoke `mark_away` /
//! `mark_active`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use relay_shared::time::Clock;

use crate::domain::{ChatStore, PresenceStatus, ServerEvent, Timestamp, UserId};
use crate::realtime::{RoomMembershipIndex, SessionRegistry};

/// Per-identity presence state machine:
/// `offline → online → away → online → … → offline`, re-enterable.
pub struct PresenceTracker {
    store: Arc<dyn ChatStore>,
    rooms: Arc<RoomMembershipIndex>,
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    statuses: Mutex<HashMap<UserId, PresenceStatus>>,
}

impl PresenceTracker {
    pub fn new(
        store: Arc<dyn ChatStore>,
        rooms: Arc<RoomMembershipIndex>,
        registry: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            rooms,
            registry,
            clock,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    /// Current in-memory presence of an identity (a cache of the
    /// authoritative persisted value)
    pub async fn status_of(&self, user_id: &UserId) -> PresenceStatus {
        let statuses = self.statuses.lock().await;
        statuses
            .get(user_id)
            .copied()
            .unwrap_or(PresenceStatus::Offline)
    }

    /// An authenticated connection was registered for the identity.
    ///
    /// Only the first connection triggers the `offline → online`
    /// transition; further devices are silent.
    pub async fn connection_opened(&self, user_id: &UserId) {
        let became_online = {
            let mut statuses = self.statuses.lock().await;
            match statuses.get(user_id) {
                None => {
                    statuses.insert(user_id.clone(), PresenceStatus::Online);
                    true
                }
                Some(_) => false,
            }
        };
        if became_online {
            self.persist_and_notify(user_id, PresenceStatus::Online).await;
        }
    }

    /// The identity's *last* connection closed.
    ///
    /// Callers gate this on the registry's `WentOffline` outcome, so the
    /// `* → offline` transition fires exactly once per identity.
    pub async fn connection_closed(&self, user_id: &UserId) {
        let went_offline = {
            let mut statuses = self.statuses.lock().await;
            statuses.remove(user_id).is_some()
        };
        if went_offline {
            self.persist_and_notify(user_id, PresenceStatus::Offline).await;
        }
    }

    /// Explicit idle signal: `online → away`
    pub async fn mark_away(&self, user_id: &UserId) {
        let transitioned = {
            let mut statuses = self.statuses.lock().await;
            match statuses.get(user_id) {
                Some(PresenceStatus::Online) => {
                    statuses.insert(user_id.clone(), PresenceStatus::Away);
                    true
                }
                _ => false,
            }
        };
        if transitioned {
            self.persist_and_notify(user_id, PresenceStatus::Away).await;
        }
    }

    /// Activity observed: `away → online`
    pub async fn mark_active(&self, user_id: &UserId) {
        let transitioned = {
            let mut statuses = self.statuses.lock().await;
            match statuses.get(user_id) {
                Some(PresenceStatus::Away) => {
                    statuses.insert(user_id.clone(), PresenceStatus::Online);
                    true
                }
                _ => false,
            }
        };
        if transitioned {
            self.persist_and_notify(user_id, PresenceStatus::Online).await;
        }
    }

    /// Persist the transition, then emit one `PresenceChanged` per live
    /// connection of other participants sharing a room with the identity.
    async fn persist_and_notify(&self, user_id: &UserId, status: PresenceStatus) {
        let last_seen = Timestamp::new(self.clock.now_utc_millis());
        if let Err(e) = self.store.set_status(user_id, status, last_seen).await {
            // The in-memory state stays ahead of the store; the next
            // transition writes again.
            tracing::warn!(user_id = %user_id, error = %e, "failed to persist presence status");
        }

        let room_ids = match self.rooms.rooms_of(user_id).await {
            Ok(room_ids) => room_ids,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "failed to resolve rooms for presence broadcast"
                );
                return;
            }
        };

        let own_connections = self.registry.connections_for(user_id).await;
        let mut targets = HashSet::new();
        for room_id in &room_ids {
            match self.rooms.live_connections_for(room_id).await {
                Ok(connections) => targets.extend(connections),
                Err(e) => {
                    tracing::warn!(
                        room_id = %room_id,
                        error = %e,
                        "failed to resolve live connections for presence broadcast"
                    );
                }
            }
        }
        for connection_id in &own_connections {
            targets.remove(connection_id);
        }
        if targets.is_empty() {
            return;
        }

        tracing::debug!(
            user_id = %user_id,
            status = status.as_str(),
            targets = targets.len(),
            "broadcasting presence change"
        );
        self.registry
            .push_to(
                &targets,
                ServerEvent::PresenceChanged {
                    user_id: user_id.clone(),
                    status,
                },
            )
            .await;
    }
}
