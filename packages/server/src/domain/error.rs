//! Domain-level error types.

use thiserror::Error;

use super::value_object::{ConnectionId, UserId};

/// Failure reported by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Invariant violation inside the session registry.
///
/// Fatal to the offending registration attempt only; other connections
/// are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connection {connection_id} is already registered to user {owner}")]
    AlreadyRegistered {
        connection_id: ConnectionId,
        owner: UserId,
    },
}
