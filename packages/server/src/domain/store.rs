//! Persistence collaborator interface.
//!
//! The domain layer defines the data access it needs; concrete backends
//! live in the infrastructure layer (dependency inversion). The realtime
//! core never touches a database directly.

use std::collections::HashSet;

use async_trait::async_trait;

use super::entity::MessageEnvelope;
use super::error::StoreError;
use super::value_object::{
    MessageContent, MessageId, MessageKind, PresenceStatus, RoomId, Timestamp, UserId,
};

#[cfg(test)]
use mockall::automock;

/// Chat persistence interface consumed by the realtime core.
///
/// `insert_message` assigns the message id and creation timestamp; the
/// assignment order of ids within one room is the delivery order the
/// core guarantees to subscribers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Durably persist a message and return the assigned envelope
    async fn insert_message(
        &self,
        room_id: &RoomId,
        sender: &UserId,
        content: MessageContent,
        kind: MessageKind,
        reply_to: Option<MessageId>,
    ) -> Result<MessageEnvelope, StoreError>;

    /// Participant identities of a room; empty set if the room is unknown
    async fn participants_of(&self, room_id: &RoomId) -> Result<HashSet<UserId>, StoreError>;

    /// Rooms the given identity participates in
    async fn rooms_of(&self, user_id: &UserId) -> Result<Vec<RoomId>, StoreError>;

    /// Whether the given message id belongs to the given room
    async fn message_in_room(
        &self,
        room_id: &RoomId,
        message_id: MessageId,
    ) -> Result<bool, StoreError>;

    /// Update the authoritative presence status and last-seen timestamp
    async fn set_status(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        last_seen: Timestamp,
    ) -> Result<(), StoreError>;
}
