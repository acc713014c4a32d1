//! Static token verifier.
//!
//! Resolves tokens against a fixed table built at startup. Suitable for
//! the demo binary and tests; anything issuing real credentials lives
//! behind the same trait, out of tree.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{AuthenticatedUser, TokenError, TokenVerifier};

/// Token verifier backed by a fixed token → identity table
#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, AuthenticatedUser>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for an identity
    pub fn insert(&mut self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens.insert(token.into(), user);
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, TokenError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(TokenError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, UserId};

    fn user(name: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: UserId::new(name.to_string()).unwrap(),
            display_name: DisplayName::new(name.to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_known_token_resolves_to_identity() {
        // given:
        let mut verifier = StaticTokenVerifier::new();
        verifier.insert("tok-alice", user("alice"));

        // when:
        let result = verifier.verify("tok-alice").await;

        // then:
        assert_eq!(result, Ok(user("alice")));
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        // given:
        let verifier = StaticTokenVerifier::new();

        // when:
        let result = verifier.verify("tok-nobody").await;

        // then:
        assert_eq!(result, Err(TokenError::InvalidToken));
    }
}
