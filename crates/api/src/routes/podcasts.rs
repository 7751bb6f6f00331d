//! Podcast CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::PodcastId;
use domain::Podcast;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{IdQuery, require_admin};

#[derive(Serialize)]
pub struct PodcastResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub video_url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Podcast> for PodcastResponse {
    fn from(podcast: Podcast) -> Self {
        Self {
            id: podcast.id.to_string(),
            title: podcast.title,
            description: podcast.description,
            image_url: podcast.image_url,
            video_url: podcast.video_url,
            created_at: podcast.created_at.to_rfc3339(),
            updated_at: podcast.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct PodcastRequest {
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn validate(req: &PodcastRequest) -> Result<(), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    if req.video_url.trim().is_empty() {
        return Err(ApiError::BadRequest("video_url is required".to_string()));
    }
    Ok(())
}

/// GET /api/podcasts - list all podcasts, or one by `?id=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<IdQuery>,
) -> Result<Response, ApiError> {
    match query.id {
        Some(id) => {
            let id = PodcastId::from_uuid(id);
            let podcast = state
                .store
                .get_podcast(id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("podcast {id} not found")))?;
            Ok(Json(PodcastResponse::from(podcast)).into_response())
        }
        None => {
            let podcasts = state.store.list_podcasts().await?;
            let responses: Vec<PodcastResponse> =
                podcasts.into_iter().map(PodcastResponse::from).collect();
            Ok(Json(responses).into_response())
        }
    }
}

/// POST /api/podcasts - create a podcast (admin).
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<PodcastRequest>,
) -> Result<(StatusCode, Json<PodcastResponse>), ApiError> {
    require_admin(&state, &headers).await?;
    validate(&req)?;

    let now = Utc::now();
    let podcast = Podcast {
        id: PodcastId::new(),
        title: req.title,
        description: req.description,
        image_url: req.image_url,
        video_url: req.video_url,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_podcast(&podcast).await?;

    Ok((StatusCode::CREATED, Json(PodcastResponse::from(podcast))))
}

/// PUT /api/podcasts?id= - update a podcast (admin).
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
    Json(req): Json<PodcastRequest>,
) -> Result<Json<PodcastResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let id = PodcastId::from_uuid(query.require()?);

    let existing = state
        .store
        .get_podcast(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("podcast {id} not found")))?;
    validate(&req)?;

    let podcast = Podcast {
        id,
        title: req.title,
        description: req.description,
        image_url: req.image_url,
        video_url: req.video_url,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.store.update_podcast(&podcast).await?;

    Ok(Json(PodcastResponse::from(podcast)))
}

/// DELETE /api/podcasts?id= - delete a podcast (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    let id = PodcastId::from_uuid(query.require()?);

    if state.store.get_podcast(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("podcast {id} not found")));
    }
    state.store.delete_podcast(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
