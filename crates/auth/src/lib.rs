//! Session verification and webhook intake for the storefront.
//!
//! Identity itself is delegated to an external provider; this crate owns the
//! seams the rest of the service talks to: a [`SessionVerifier`] that turns a
//! bearer token into [`SessionClaims`], and a [`WebhookVerifier`] plus payload
//! parsing for provider-originated identity events.

mod error;
mod session;
mod webhook;

pub use error::AuthError;
pub use session::{SessionClaims, SessionVerifier, StaticSessionVerifier};
pub use webhook::{
    IdentityEvent, IdentityEventKind, SharedSecretWebhookVerifier, WebhookVerifier,
    parse_identity_event,
};
