//! Request helpers shared across route modules.

use auth::{SessionClaims, SessionVerifier};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use serde::Deserialize;
use store::Store;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// `?id=` query parameter used by the by-id CRUD operations.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<Uuid>,
}

impl IdQuery {
    /// Returns the id or a 400 explaining it is required.
    pub fn require(&self) -> Result<Uuid, ApiError> {
        self.id
            .ok_or_else(|| ApiError::BadRequest("id query parameter is required".to_string()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Resolves the request's bearer token into session claims.
pub async fn authenticate<S: Store>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<SessionClaims, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("missing credentials".to_string()))?;
    Ok(state.sessions.verify(token).await?)
}

/// Like [`authenticate`] but treats missing or invalid tokens as anonymous.
pub async fn authenticate_optional<S: Store>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Option<SessionClaims> {
    let token = bearer_token(headers)?;
    state.sessions.verify(token).await.ok()
}

/// Requires a session carrying the admin role.
pub async fn require_admin<S: Store>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<SessionClaims, ApiError> {
    let claims = authenticate(state, headers).await?;
    if !claims.is_admin() {
        return Err(ApiError::Unauthorized("admin access required".to_string()));
    }
    Ok(claims)
}
