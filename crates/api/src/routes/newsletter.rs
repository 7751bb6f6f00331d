//! Newsletter subscription endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::NewsletterId;
use domain::{Newsletter, is_valid_email};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::IdQuery;

#[derive(Serialize)]
pub struct NewsletterResponse {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

impl From<Newsletter> for NewsletterResponse {
    fn from(entry: Newsletter) -> Self {
        Self {
            id: entry.id.to_string(),
            email: entry.email,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// GET /api/newsletter - list subscribers, or one by `?id=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<IdQuery>,
) -> Result<Response, ApiError> {
    match query.id {
        Some(id) => {
            let id = NewsletterId::from_uuid(id);
            let entry = state
                .store
                .get_newsletter(id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("subscription {id} not found")))?;
            Ok(Json(NewsletterResponse::from(entry)).into_response())
        }
        None => {
            let entries = state.store.list_newsletters().await?;
            let responses: Vec<NewsletterResponse> =
                entries.into_iter().map(NewsletterResponse::from).collect();
            Ok(Json(responses).into_response())
        }
    }
}

/// POST /api/newsletter - subscribe an email address.
#[tracing::instrument(skip(state, req))]
pub async fn subscribe<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<NewsletterResponse>), ApiError> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }
    if state.store.get_newsletter_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest(
            "email is already subscribed".to_string(),
        ));
    }

    let entry = Newsletter {
        id: NewsletterId::new(),
        email,
        created_at: Utc::now(),
    };
    state.store.insert_newsletter(&entry).await?;

    Ok((StatusCode::CREATED, Json(NewsletterResponse::from(entry))))
}
