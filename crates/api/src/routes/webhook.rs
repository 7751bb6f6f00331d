//! Identity provider webhook endpoint.

use std::sync::Arc;

use auth::{IdentityEventKind, WebhookVerifier, parse_identity_event};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

const SIGNATURE_HEADER: &str = "svix-signature";

#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// POST /api/webhook/clerk - identity event intake. `user.created`
/// provisions a local user row; everything else is acknowledged and
/// dropped.
#[tracing::instrument(skip(state, headers, body))]
pub async fn clerk<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let verifier = state
        .webhook
        .as_ref()
        .ok_or_else(|| ApiError::Internal("webhook secret not configured".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing webhook signature".to_string()))?;
    verifier.verify(signature, &body).await?;

    let event = parse_identity_event(&body)?;
    match event.kind {
        IdentityEventKind::UserCreated => {
            let email = event.email.ok_or_else(|| {
                ApiError::BadRequest("user.created event without email".to_string())
            })?;
            let user = state
                .store
                .upsert_user(&event.external_id, &email, event.name.as_deref())
                .await?;
            tracing::info!(user_id = %user.id, external_id = %user.external_id, "user provisioned");
        }
        IdentityEventKind::Other(kind) => {
            tracing::debug!(%kind, "ignoring identity event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}
