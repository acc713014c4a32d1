//! Server state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::realtime::{RoomMembershipIndex, SessionRegistry};
use crate::usecase::{
    AuthenticateConnectionUseCase, DisconnectConnectionUseCase, MessageRouter, PresenceTracker,
    SubscribeRoomUseCase, TypingTracker,
};

/// Tunables for the realtime transport
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bound of each connection's outbound queue
    pub outbound_capacity: usize,
    /// How long an anonymous connection may sit unauthenticated before
    /// it is closed
    pub auth_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            auth_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub authenticate_usecase: Arc<AuthenticateConnectionUseCase>,
    pub disconnect_usecase: Arc<DisconnectConnectionUseCase>,
    pub subscribe_usecase: Arc<SubscribeRoomUseCase>,
    pub message_router: MessageRouter,
    pub presence_tracker: Arc<PresenceTracker>,
    pub typing_tracker: Arc<TypingTracker>,
    pub registry: Arc<SessionRegistry>,
    pub rooms: Arc<RoomMembershipIndex>,
    pub config: ServerConfig,
}
