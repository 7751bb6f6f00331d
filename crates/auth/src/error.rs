use thiserror::Error;

/// Errors raised while verifying sessions or webhook deliveries.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token was presented on a request that requires one.
    #[error("missing credentials")]
    MissingCredentials,

    /// The presented token did not resolve to a session.
    #[error("invalid session token")]
    InvalidToken,

    /// The webhook signature did not match.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// The webhook payload could not be parsed.
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),
}
