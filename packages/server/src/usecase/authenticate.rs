//! Connection authentication.
//!
//! Resolves the presented token through the verification collaborator,
//! registers the connection in the session registry, and drives the
//! presence transition for the identity's first connection. On failure
//! the connection stays open and anonymous; the client may retry.

use std::sync::Arc;

use crate::domain::{AuthenticatedUser, ConnectionId, TokenVerifier};
use crate::realtime::{OutboundQueue, SessionRegistry};

use super::error::AuthenticateError;
use super::presence::PresenceTracker;

/// Authenticates a connection and brings its identity online
pub struct AuthenticateConnectionUseCase {
    verifier: Arc<dyn TokenVerifier>,
    registry: Arc<SessionRegistry>,
    presence: Arc<PresenceTracker>,
}

impl AuthenticateConnectionUseCase {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        registry: Arc<SessionRegistry>,
        presence: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            verifier,
            registry,
            presence,
        }
    }

    /// Verify the token and register the connection under the resolved
    /// identity.
    ///
    /// # Arguments
    ///
    /// * `connection_id` - The transport connection presenting the token
    /// * `token` - The opaque credential to verify
    /// * `queue` - The connection's outbound queue handle, kept by the
    ///   registry for fan-out
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        token: &str,
        queue: OutboundQueue,
    ) -> Result<AuthenticatedUser, AuthenticateError> {
        let user = self
            .verifier
            .verify(token)
            .await
            .map_err(|_| AuthenticateError::InvalidToken)?;

        if let Err(e) = self
            .registry
            .register(user.user_id.clone(), connection_id, queue)
            .await
        {
            tracing::error!(
                connection_id = %connection_id,
                error = %e,
                "registration invariant violation"
            );
            return Err(AuthenticateError::Registry(e));
        }

        self.presence.connection_opened(&user.user_id).await;

        tracing::info!(
            user_id = %user.user_id,
            connection_id = %connection_id,
            "connection authenticated"
        );
        Ok(user)
    }
}
