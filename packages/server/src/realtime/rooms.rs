//! Room membership index.
//!
//! Caches participant sets loaded from the persistence collaborator and
//! composes them with the session registry to answer "which live
//! connections does this room reach right now". The composition is
//! recomputed on demand rather than cached, so registry and membership
//! bookkeeping cannot drift apart.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{ChatStore, ConnectionId, RoomId, StoreError, UserId};

use super::registry::SessionRegistry;

/// Cached participant lookup for rooms
pub struct RoomMembershipIndex {
    store: Arc<dyn ChatStore>,
    registry: Arc<SessionRegistry>,
    cache: Mutex<HashMap<RoomId, Arc<HashSet<UserId>>>>,
}

impl RoomMembershipIndex {
    pub fn new(store: Arc<dyn ChatStore>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            store,
            registry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Participant identities of a room, loaded once and cached until
    /// `membership_changed` invalidates the entry
    pub async fn load(&self, room_id: &RoomId) -> Result<Arc<HashSet<UserId>>, StoreError> {
        {
            let cache = self.cache.lock().await;
            if let Some(participants) = cache.get(room_id) {
                return Ok(participants.clone());
            }
        }
        let participants = Arc::new(self.store.participants_of(room_id).await?);
        let mut cache = self.cache.lock().await;
        let entry = cache
            .entry(room_id.clone())
            .or_insert_with(|| participants.clone());
        Ok(entry.clone())
    }

    /// Invalidation hook for membership changes pushed from persistence
    pub async fn membership_changed(&self, room_id: &RoomId) {
        let mut cache = self.cache.lock().await;
        cache.remove(room_id);
        tracing::debug!(room_id = %room_id, "room membership cache invalidated");
    }

    /// Authorization check used before any send or subscribe
    pub async fn is_participant(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<bool, StoreError> {
        Ok(self.load(room_id).await?.contains(user_id))
    }

    /// Live connections of the room's participants, computed as the
    /// intersection of the participant set with the session registry
    pub async fn live_connections_for(
        &self,
        room_id: &RoomId,
    ) -> Result<HashSet<ConnectionId>, StoreError> {
        let participants = self.load(room_id).await?;
        let mut connections = HashSet::new();
        for user_id in participants.iter() {
            connections.extend(self.registry.connections_for(user_id).await);
        }
        Ok(connections)
    }

    /// Rooms the identity participates in; always read through to the
    /// store (used for presence targeting, where staleness would leak
    /// or suppress notifications)
    pub async fn rooms_of(&self, user_id: &UserId) -> Result<Vec<RoomId>, StoreError> {
        self.store.rooms_of(user_id).await
    }
}
