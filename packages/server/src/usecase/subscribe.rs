//! Room subscription.
//!
//! Join/leave maintain a per-connection audit set of rooms the client is
//! actively viewing. Fan-out deliberately does *not* depend on it:
//! messages reach every participant connection whether joined or not,
//! so a membership lookup can never be bypassed by skipping the join.
//! Join still gates on participation so a client cannot subscribe to a
//! room it has no business observing.

use std::sync::Arc;

use crate::domain::{RoomId, UserId};
use crate::realtime::RoomMembershipIndex;

use super::error::SubscribeError;

/// Validates room subscriptions for the connection handler
pub struct SubscribeRoomUseCase {
    rooms: Arc<RoomMembershipIndex>,
}

impl SubscribeRoomUseCase {
    pub fn new(rooms: Arc<RoomMembershipIndex>) -> Self {
        Self { rooms }
    }

    /// Authorize a join; the caller records the room in the connection's
    /// joined set on success
    pub async fn join(&self, user_id: &UserId, room_id: &RoomId) -> Result<(), SubscribeError> {
        if !self.rooms.is_participant(room_id, user_id).await? {
            tracing::debug!(user_id = %user_id, room_id = %room_id, "join rejected: not a participant");
            return Err(SubscribeError::Forbidden);
        }
        tracing::debug!(user_id = %user_id, room_id = %room_id, "joined room");
        Ok(())
    }

    /// Record a leave; purely local to the connection's joined set
    pub fn leave(&self, user_id: &UserId, room_id: &RoomId) {
        tracing::debug!(user_id = %user_id, room_id = %room_id, "left room");
    }
}
