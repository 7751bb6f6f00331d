//! Webhook delivery verification and identity event parsing.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AuthError;

/// Trait for verifying that a webhook delivery came from the identity provider.
#[async_trait]
pub trait WebhookVerifier: Send + Sync {
    /// Verifies the delivery signature against the raw body.
    async fn verify(&self, signature: &str, body: &[u8]) -> Result<(), AuthError>;
}

/// Shared-secret webhook verifier.
///
/// The provider signs deliveries; here the signature header must equal the
/// configured secret. Sufficient for the seam the routes depend on without
/// binding the crate to one provider's signing scheme.
#[derive(Debug, Clone)]
pub struct SharedSecretWebhookVerifier {
    secret: String,
}

impl SharedSecretWebhookVerifier {
    /// Creates a verifier for the given shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl WebhookVerifier for SharedSecretWebhookVerifier {
    async fn verify(&self, signature: &str, _body: &[u8]) -> Result<(), AuthError> {
        if signature == self.secret {
            Ok(())
        } else {
            tracing::warn!("webhook delivery rejected: signature mismatch");
            Err(AuthError::InvalidSignature)
        }
    }
}

/// The kind of identity event a webhook delivery carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEventKind {
    /// A user finished signing up with the provider.
    UserCreated,
    /// Any event type the service does not act on.
    Other(String),
}

/// A parsed identity event from the provider.
#[derive(Debug, Clone)]
pub struct IdentityEvent {
    pub kind: IdentityEventKind,
    /// The provider's identifier for the user.
    pub external_id: String,
    /// Primary email address, when the payload carries one.
    pub email: Option<String>,
    /// Display name assembled from the payload's name fields.
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawUserData,
}

#[derive(Deserialize)]
struct RawUserData {
    id: String,
    #[serde(default)]
    email_addresses: Vec<RawEmailAddress>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Deserialize)]
struct RawEmailAddress {
    email_address: String,
}

/// Parses a raw webhook body into an [`IdentityEvent`].
pub fn parse_identity_event(body: &[u8]) -> Result<IdentityEvent, AuthError> {
    let raw: RawEvent =
        serde_json::from_slice(body).map_err(|e| AuthError::MalformedPayload(e.to_string()))?;

    let kind = match raw.event_type.as_str() {
        "user.created" => IdentityEventKind::UserCreated,
        other => IdentityEventKind::Other(other.to_string()),
    };

    let email = raw
        .data
        .email_addresses
        .first()
        .map(|e| e.email_address.clone());

    let name = match (raw.data.first_name, raw.data.last_name) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first),
        (None, Some(last)) => Some(last),
        (None, None) => None,
    };

    Ok(IdentityEvent {
        kind,
        external_id: raw.data.id,
        email,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_secret_match() {
        let verifier = SharedSecretWebhookVerifier::new("whsec_test");
        assert!(verifier.verify("whsec_test", b"{}").await.is_ok());
        assert!(matches!(
            verifier.verify("whsec_wrong", b"{}").await,
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_parse_user_created() {
        let body = serde_json::json!({
            "type": "user.created",
            "data": {
                "id": "user_2abc",
                "email_addresses": [{"email_address": "new@example.com"}],
                "first_name": "New",
                "last_name": "Reader"
            }
        });
        let event = parse_identity_event(body.to_string().as_bytes()).unwrap();
        assert_eq!(event.kind, IdentityEventKind::UserCreated);
        assert_eq!(event.external_id, "user_2abc");
        assert_eq!(event.email.as_deref(), Some("new@example.com"));
        assert_eq!(event.name.as_deref(), Some("New Reader"));
    }

    #[test]
    fn test_parse_other_event_kind() {
        let body = serde_json::json!({
            "type": "user.deleted",
            "data": {"id": "user_2abc"}
        });
        let event = parse_identity_event(body.to_string().as_bytes()).unwrap();
        assert_eq!(
            event.kind,
            IdentityEventKind::Other("user.deleted".to_string())
        );
        assert!(event.email.is_none());
        assert!(event.name.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        let result = parse_identity_event(b"not json");
        assert!(matches!(result, Err(AuthError::MalformedPayload(_))));
    }

    #[test]
    fn test_name_falls_back_to_single_field() {
        let body = serde_json::json!({
            "type": "user.created",
            "data": {
                "id": "user_2xyz",
                "email_addresses": [{"email_address": "solo@example.com"}],
                "first_name": "Solo"
            }
        });
        let event = parse_identity_event(body.to_string().as_bytes()).unwrap();
        assert_eq!(event.name.as_deref(), Some("Solo"));
    }
}
