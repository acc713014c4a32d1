//! Connection teardown.
//!
//! Runs on every transport disconnect, including forced closes of slow
//! consumers and anonymous connections that never authenticated. The
//! registry entry goes first so no stale fan-out target survives, then
//! typing indicators clear, then presence transitions if this was the
//! identity's last connection.

use std::sync::Arc;

use crate::domain::ConnectionId;
use crate::realtime::{SessionRegistry, UnregisterOutcome};

use super::presence::PresenceTracker;
use super::typing::TypingTracker;

/// Tears down all realtime state tied to one connection
pub struct DisconnectConnectionUseCase {
    registry: Arc<SessionRegistry>,
    presence: Arc<PresenceTracker>,
    typing: Arc<TypingTracker>,
}

impl DisconnectConnectionUseCase {
    pub fn new(
        registry: Arc<SessionRegistry>,
        presence: Arc<PresenceTracker>,
        typing: Arc<TypingTracker>,
    ) -> Self {
        Self {
            registry,
            presence,
            typing,
        }
    }

    pub async fn execute(&self, connection_id: ConnectionId) -> UnregisterOutcome {
        let outcome = self.registry.unregister(connection_id).await;

        self.typing.clear_connection(connection_id).await;

        match &outcome {
            UnregisterOutcome::WentOffline(user_id) => {
                self.presence.connection_closed(user_id).await;
                tracing::info!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    "last connection closed, identity offline"
                );
            }
            UnregisterOutcome::StillOnline(user_id) => {
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    "connection closed, other devices remain"
                );
            }
            UnregisterOutcome::NotRegistered => {
                tracing::debug!(
                    connection_id = %connection_id,
                    "anonymous connection closed"
                );
            }
        }
        outcome
    }
}
