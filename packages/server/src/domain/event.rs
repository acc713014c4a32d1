//! Events the realtime core emits toward connected clients.
//!
//! The transport layer is responsible for encoding these onto the wire;
//! the core only decides *what* each connection should receive.

use super::entity::MessageEnvelope;
use super::value_object::{PresenceStatus, RoomId, UserId};

/// Error categories surfaced to a client on its own connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthenticationFailure,
    NotAuthenticated,
    Forbidden,
    InvalidMessage,
    PersistenceError,
    SlowConsumer,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailure => "authentication_failure",
            Self::NotAuthenticated => "not_authenticated",
            Self::Forbidden => "forbidden",
            Self::InvalidMessage => "invalid_message",
            Self::PersistenceError => "persistence_error",
            Self::SlowConsumer => "slow_consumer",
        }
    }
}

/// Outbound event, delivered per connection through its outbound queue
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Authenticated {
        success: bool,
        error: Option<String>,
    },
    NewMessage {
        envelope: MessageEnvelope,
    },
    PresenceChanged {
        user_id: UserId,
        status: PresenceStatus,
    },
    TypingStarted {
        user_id: UserId,
        room_id: RoomId,
    },
    TypingStopped {
        user_id: UserId,
        room_id: RoomId,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl ServerEvent {
    /// Whether this event may be shed under outbound backpressure.
    ///
    /// Presence and typing are ephemeral best-effort signals; message
    /// envelopes and direct responses must never be dropped silently.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            Self::PresenceChanged { .. } | Self::TypingStarted { .. } | Self::TypingStopped { .. }
        )
    }
}
