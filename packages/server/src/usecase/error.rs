//! UseCase-level error types and their mapping onto client-visible
//! error categories.

use thiserror::Error;

use crate::domain::{ErrorKind, RegistryError, StoreError};

/// Authentication failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticateError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Message submission failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("sender is not a participant of the room")]
    Forbidden,
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden => ErrorKind::Forbidden,
            Self::InvalidMessage(_) => ErrorKind::InvalidMessage,
            Self::Persistence(_) => ErrorKind::PersistenceError,
        }
    }
}

/// Room subscription failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("not a participant of the room")]
    Forbidden,
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl SubscribeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden => ErrorKind::Forbidden,
            Self::Persistence(_) => ErrorKind::PersistenceError,
        }
    }
}

/// Typing indicator failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypingError {
    #[error("not a participant of the room")]
    Forbidden,
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl TypingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden => ErrorKind::Forbidden,
            Self::Persistence(_) => ErrorKind::PersistenceError,
        }
    }
}
