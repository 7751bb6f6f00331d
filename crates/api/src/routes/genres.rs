//! Genre CRUD and ordering endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::GenreId;
use domain::Genre;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{IdQuery, require_admin};

#[derive(Serialize)]
pub struct GenreResponse {
    pub id: String,
    pub name: String,
    pub display_order: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Genre> for GenreResponse {
    fn from(genre: Genre) -> Self {
        Self {
            id: genre.id.to_string(),
            name: genre.name,
            display_order: genre.display_order,
            created_at: genre.created_at.to_rfc3339(),
            updated_at: genre.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct GenreRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub ordered_ids: Vec<uuid::Uuid>,
}

/// GET /api/genres - list genres in display order, or one by `?id=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<IdQuery>,
) -> Result<Response, ApiError> {
    match query.id {
        Some(id) => {
            let id = GenreId::from_uuid(id);
            let genre = state
                .store
                .get_genre(id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("genre {id} not found")))?;
            Ok(Json(GenreResponse::from(genre)).into_response())
        }
        None => {
            let genres = state.store.list_genres().await?;
            let responses: Vec<GenreResponse> =
                genres.into_iter().map(GenreResponse::from).collect();
            Ok(Json(responses).into_response())
        }
    }
}

/// POST /api/genres - create a genre (admin). New genres go to the end of
/// the display order.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<GenreRequest>,
) -> Result<(StatusCode, Json<GenreResponse>), ApiError> {
    require_admin(&state, &headers).await?;

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if state.store.get_genre_by_name(&name).await?.is_some() {
        return Err(ApiError::BadRequest(format!(
            "genre \"{name}\" already exists"
        )));
    }

    let now = Utc::now();
    let genre = Genre {
        id: GenreId::new(),
        name,
        display_order: state.store.count_genres().await? as i32,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_genre(&genre).await?;

    Ok((StatusCode::CREATED, Json(GenreResponse::from(genre))))
}

/// PUT /api/genres?id= - rename a genre (admin).
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
    Json(req): Json<GenreRequest>,
) -> Result<Json<GenreResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let id = GenreId::from_uuid(query.require()?);

    let mut genre = state
        .store
        .get_genre(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("genre {id} not found")))?;

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if let Some(other) = state.store.get_genre_by_name(&name).await?
        && other.id != id
    {
        return Err(ApiError::BadRequest(format!(
            "genre \"{name}\" already exists"
        )));
    }

    genre.name = name;
    genre.updated_at = Utc::now();
    state.store.update_genre(&genre).await?;

    Ok(Json(GenreResponse::from(genre)))
}

/// PATCH /api/genres - rewrite the display order (admin). Unknown ids
/// reject the whole request with no writes.
#[tracing::instrument(skip(state, headers, req))]
pub async fn reorder<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<GenreResponse>>, ApiError> {
    require_admin(&state, &headers).await?;

    if req.ordered_ids.is_empty() {
        return Err(ApiError::BadRequest("ordered_ids must not be empty".to_string()));
    }
    let ids: Vec<GenreId> = req
        .ordered_ids
        .iter()
        .copied()
        .map(GenreId::from_uuid)
        .collect();
    state.store.reorder_genres(&ids).await?;

    let genres = state.store.list_genres().await?;
    Ok(Json(genres.into_iter().map(GenreResponse::from).collect()))
}

/// DELETE /api/genres?id= - delete a genre (admin); blocked while books
/// reference it.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    let id = GenreId::from_uuid(query.require()?);

    if state.store.get_genre(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("genre {id} not found")));
    }
    if state.store.genre_has_books(id).await? {
        return Err(ApiError::BadRequest(
            "genre still has books assigned".to_string(),
        ));
    }
    state.store.delete_genre(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
