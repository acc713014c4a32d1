//! Token verification collaborator interface.
//!
//! Credential storage and token issuance are outside the realtime core;
//! the core only needs to resolve a presented token to an identity.

use async_trait::async_trait;
use thiserror::Error;

use super::value_object::{DisplayName, UserId};

#[cfg(test)]
use mockall::automock;

/// Identity resolved from a valid token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub display_name: DisplayName,
}

/// Token verification failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid or expired token")]
    InvalidToken,
}

/// Token verification interface consumed by the realtime core
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Resolve a token to the identity it was issued for
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, TokenError>;
}
