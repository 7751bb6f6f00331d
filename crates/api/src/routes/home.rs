//! Home page aggregate endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::books::BookResponse;
use crate::routes::podcasts::PodcastResponse;

const FEATURED_LIMIT: i64 = 4;
const PODCAST_LIMIT: i64 = 4;
const GENRE_LIMIT: usize = 5;
const BUNDLE_GENRE_FRAGMENT: &str = "bundle";

#[derive(Serialize)]
pub struct GenreSummary {
    pub id: String,
    pub name: String,
    pub available_books: u64,
}

#[derive(Serialize)]
pub struct HomeResponse {
    pub featured_books: Vec<BookResponse>,
    pub bundle_books: Vec<BookResponse>,
    pub genres: Vec<GenreSummary>,
    pub total_genres: u64,
    pub podcasts: Vec<PodcastResponse>,
}

/// GET /api/home - everything the landing page needs in one call.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<HomeResponse>, ApiError> {
    let featured_books: Vec<BookResponse> = state
        .store
        .list_featured_books(FEATURED_LIMIT)
        .await?
        .into_iter()
        .map(BookResponse::from)
        .collect();

    let bundle_genres = state
        .store
        .find_genres_named_like(BUNDLE_GENRE_FRAGMENT)
        .await?;
    let bundle_ids: Vec<_> = bundle_genres.iter().map(|g| g.id).collect();
    let bundle_books: Vec<BookResponse> = if bundle_ids.is_empty() {
        Vec::new()
    } else {
        state
            .store
            .list_books_in_genres(&bundle_ids)
            .await?
            .into_iter()
            .map(BookResponse::from)
            .collect()
    };

    let all_genres = state.store.list_genres().await?;
    let total_genres = all_genres.len() as u64;
    let mut genres = Vec::with_capacity(GENRE_LIMIT);
    for genre in all_genres.into_iter().take(GENRE_LIMIT) {
        let available_books = state
            .store
            .count_available_books_in_genre(genre.id)
            .await?;
        genres.push(GenreSummary {
            id: genre.id.to_string(),
            name: genre.name,
            available_books,
        });
    }

    let podcasts: Vec<PodcastResponse> = state
        .store
        .list_recent_podcasts(PODCAST_LIMIT)
        .await?
        .into_iter()
        .map(PodcastResponse::from)
        .collect();

    Ok(Json(HomeResponse {
        featured_books,
        bundle_books,
        genres,
        total_genres,
        podcasts,
    }))
}
