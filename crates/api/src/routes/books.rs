//! Book catalog CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::{BookId, GenreId};
use domain::{Book, Money, ProductType};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{IdQuery, require_admin};

#[derive(Serialize)]
pub struct BookResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub genre_id: String,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub button_text: Option<String>,
    pub is_available: bool,
    pub is_featured: bool,
    pub product_type: ProductType,
    pub download_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.to_string(),
            title: book.title,
            description: book.description,
            price_cents: book.price.cents(),
            genre_id: book.genre_id.to_string(),
            author: book.author,
            image_url: book.image_url,
            button_text: book.button_text,
            is_available: book.is_available,
            is_featured: book.is_featured,
            product_type: book.product_type,
            download_url: book.download_url,
            created_at: book.created_at.to_rfc3339(),
            updated_at: book.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct BookRequest {
    pub title: String,
    pub price_cents: i64,
    pub genre_id: uuid::Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub download_url: Option<String>,
}

fn default_true() -> bool {
    true
}

async fn validate<S: Store>(state: &AppState<S>, req: &BookRequest) -> Result<(), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    if Money::from_cents(req.price_cents).is_negative() {
        return Err(ApiError::BadRequest(
            "price_cents must not be negative".to_string(),
        ));
    }
    let genre_id = GenreId::from_uuid(req.genre_id);
    if state.store.get_genre(genre_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "genre {genre_id} does not exist"
        )));
    }
    Ok(())
}

/// GET /api/books - list all books, or one by `?id=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<IdQuery>,
) -> Result<Response, ApiError> {
    match query.id {
        Some(id) => {
            let id = BookId::from_uuid(id);
            let book = state
                .store
                .get_book(id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("book {id} not found")))?;
            Ok(Json(BookResponse::from(book)).into_response())
        }
        None => {
            let books = state.store.list_books().await?;
            let responses: Vec<BookResponse> =
                books.into_iter().map(BookResponse::from).collect();
            Ok(Json(responses).into_response())
        }
    }
}

/// POST /api/books - create a book (admin).
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    require_admin(&state, &headers).await?;
    validate(&state, &req).await?;

    let now = Utc::now();
    let book = Book {
        id: BookId::new(),
        title: req.title,
        description: req.description,
        price: Money::from_cents(req.price_cents),
        genre_id: GenreId::from_uuid(req.genre_id),
        author: req.author,
        image_url: req.image_url,
        button_text: req.button_text,
        is_available: req.is_available,
        is_featured: req.is_featured,
        product_type: req.product_type.unwrap_or(ProductType::Physical),
        download_url: req.download_url,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_book(&book).await?;

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// PUT /api/books?id= - update a book (admin).
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
    Json(req): Json<BookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let id = BookId::from_uuid(query.require()?);

    let existing = state
        .store
        .get_book(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {id} not found")))?;
    validate(&state, &req).await?;

    let book = Book {
        id,
        title: req.title,
        description: req.description,
        price: Money::from_cents(req.price_cents),
        genre_id: GenreId::from_uuid(req.genre_id),
        author: req.author,
        image_url: req.image_url,
        button_text: req.button_text,
        is_available: req.is_available,
        is_featured: req.is_featured,
        product_type: req.product_type.unwrap_or(existing.product_type),
        download_url: req.download_url,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.store.update_book(&book).await?;

    Ok(Json(BookResponse::from(book)))
}

/// DELETE /api/books?id= - delete a book (admin); blocked while order items
/// reference it.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    let id = BookId::from_uuid(query.require()?);

    if state.store.get_book(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("book {id} not found")));
    }
    if state.store.book_has_order_items(id).await? {
        return Err(ApiError::BadRequest(
            "book is referenced by existing orders".to_string(),
        ));
    }
    state.store.delete_book(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
