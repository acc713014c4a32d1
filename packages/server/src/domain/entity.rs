//! Domain entities.

use super::value_object::{
    DisplayName, MessageContent, MessageId, MessageKind, RoomId, Timestamp, UserId,
};

/// A durably persisted chat message.
///
/// The id and creation timestamp are assigned by the persistence
/// collaborator; an envelope only exists once the write has committed.
/// Fan-out never runs ahead of that commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: UserId,
    pub sender_name: DisplayName,
    pub content: MessageContent,
    pub kind: MessageKind,
    pub reply_to: Option<MessageId>,
    pub created_at: Timestamp,
}
