//! Session verification trait and static implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use domain::Role;

use crate::error::AuthError;

/// Claims resolved from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// The local user the session belongs to.
    pub user_id: UserId,
    /// The role claim carried by the session.
    pub role: Role,
}

impl SessionClaims {
    /// True when the session carries the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Trait for resolving bearer tokens into session claims.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Verifies a bearer token and returns the claims it carries.
    async fn verify(&self, token: &str) -> Result<SessionClaims, AuthError>;
}

/// Token registry backed verifier.
///
/// Stands in for the external identity provider: sessions are registered
/// up front and looked up by exact token match.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionVerifier {
    sessions: Arc<RwLock<HashMap<String, SessionClaims>>>,
}

impl StaticSessionVerifier {
    /// Creates an empty verifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token that resolves to the given claims.
    pub fn register(&self, token: impl Into<String>, claims: SessionClaims) {
        self.sessions.write().unwrap().insert(token.into(), claims);
    }

    /// Removes a token, ending its session.
    pub fn revoke(&self, token: &str) {
        self.sessions.write().unwrap().remove(token);
    }

    /// Returns the number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}

#[async_trait]
impl SessionVerifier for StaticSessionVerifier {
    async fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.sessions
            .read()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_registered_token() {
        let verifier = StaticSessionVerifier::new();
        let claims = SessionClaims {
            user_id: UserId::new(),
            role: Role::Admin,
        };
        verifier.register("tok-admin", claims.clone());

        let resolved = verifier.verify("tok-admin").await.unwrap();
        assert_eq!(resolved, claims);
        assert!(resolved.is_admin());
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let verifier = StaticSessionVerifier::new();
        let result = verifier.verify("tok-missing").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoked_token_rejected() {
        let verifier = StaticSessionVerifier::new();
        verifier.register(
            "tok-user",
            SessionClaims {
                user_id: UserId::new(),
                role: Role::User,
            },
        );
        assert_eq!(verifier.session_count(), 1);

        verifier.revoke("tok-user");
        assert_eq!(verifier.session_count(), 0);
        assert!(verifier.verify("tok-user").await.is_err());
    }
}
