//! Message routing: authorize, validate, persist, fan out.
//!
//! Durability precedes visibility: an envelope is broadcast only after
//! the storage collaborator has committed it and assigned its id. Both
//! the insert and the fan-out enqueue run under a per-room lock, so
//! every subscriber observes one room's messages in assignment order;
//! unrelated rooms proceed in parallel.
//!
//! Delivery goes to every live connection of every room participant,
//! whether or not that connection has joined the room, and *including*
//! the sender's own connections: the echo doubles as the multi-device
//! copy and as the sender's acknowledgement. Clients dedup by message
//! id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    ChatStore, MessageContent, MessageEnvelope, MessageId, MessageKind, RoomId, ServerEvent,
    StoreError, UserId,
};
use crate::realtime::{RoomMembershipIndex, SessionRegistry};

use super::error::SubmitError;

/// Routes inbound message intents to storage and live recipients.
///
/// Cheap to clone; clones share the same per-room locks.
#[derive(Clone)]
pub struct MessageRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    store: Arc<dyn ChatStore>,
    rooms: Arc<RoomMembershipIndex>,
    registry: Arc<SessionRegistry>,
    room_locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn ChatStore>,
        rooms: Arc<RoomMembershipIndex>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                store,
                rooms,
                registry,
                room_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Submit a message for delivery to a room.
    ///
    /// Fails with `Forbidden` when the sender is not a participant,
    /// `InvalidMessage` when `reply_to` does not reference a message of
    /// the same room, and `Persistence` when the durable write fails,
    /// in which case nothing is fanned out and the client may retry.
    pub async fn submit(
        &self,
        sender: UserId,
        room_id: RoomId,
        content: MessageContent,
        kind: MessageKind,
        reply_to: Option<MessageId>,
    ) -> Result<MessageEnvelope, SubmitError> {
        if !self.inner.rooms.is_participant(&room_id, &sender).await? {
            return Err(SubmitError::Forbidden);
        }
        if let Some(reply_id) = reply_to {
            if !self.inner.store.message_in_room(&room_id, reply_id).await? {
                return Err(SubmitError::InvalidMessage(format!(
                    "reply target {reply_id} is not a message of room {room_id}"
                )));
            }
        }

        // Detach the persist-and-fan-out step from the caller: a
        // disconnect that aborts the submitting connection's task must
        // not cancel a write that may already have committed.
        let router = self.clone();
        let task = tokio::spawn(async move {
            router
                .persist_and_fan_out(sender, room_id, content, kind, reply_to)
                .await
        });
        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "message routing task failed");
                Err(SubmitError::Persistence(StoreError::Unavailable(
                    "message routing task failed".to_string(),
                )))
            }
        }
    }

    async fn persist_and_fan_out(
        &self,
        sender: UserId,
        room_id: RoomId,
        content: MessageContent,
        kind: MessageKind,
        reply_to: Option<MessageId>,
    ) -> Result<MessageEnvelope, SubmitError> {
        let room_lock = self.lock_for(&room_id).await;
        let _guard = room_lock.lock().await;

        let envelope = self
            .inner
            .store
            .insert_message(&room_id, &sender, content, kind, reply_to)
            .await?;

        let targets = match self.inner.rooms.live_connections_for(&room_id).await {
            Ok(targets) => targets,
            Err(e) => {
                // The write committed; recipients will see the message in
                // their history even though live delivery was skipped.
                tracing::error!(
                    room_id = %room_id,
                    message_id = %envelope.id,
                    error = %e,
                    "failed to resolve fan-out targets for persisted message"
                );
                return Ok(envelope);
            }
        };

        tracing::debug!(
            room_id = %room_id,
            message_id = %envelope.id,
            targets = targets.len(),
            "fanning out message"
        );
        let overflowed = self
            .inner
            .registry
            .push_to(
                &targets,
                ServerEvent::NewMessage {
                    envelope: envelope.clone(),
                },
            )
            .await;
        for connection_id in overflowed {
            tracing::warn!(
                connection_id = %connection_id,
                room_id = %room_id,
                "slow consumer dropped from fan-out"
            );
        }

        Ok(envelope)
    }

    /// Per-room lock, created on first use
    async fn lock_for(&self, room_id: &RoomId) -> Arc<Mutex<()>> {
        let mut locks = self.inner.room_locks.lock().await;
        locks
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
