//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use checkout::{ShippingAddressInput, ShippingChoice};
use common::{AddressId, BookId};
use domain::{Cart, NewCartItem};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::authenticate;

#[derive(Deserialize)]
pub struct CheckoutItemRequest {
    pub book_id: uuid::Uuid,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItemRequest>,
    #[serde(default)]
    pub shipping_address_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddressInput>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub redirect_url: String,
}

/// POST /api/checkout - turn the submitted cart into a pending order and
/// a hosted payment session.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let claims = authenticate(&state, &headers).await?;
    metrics::counter!("checkout_attempts_total").increment(1);

    // Rebuild the cart server-side from the submitted line items; prices
    // and product types come from the catalog, not the client.
    let mut cart = Cart::new();
    for item in &req.items {
        let book_id = BookId::from_uuid(item.book_id);
        let book = state
            .store
            .get_book(book_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("book {book_id} is not available")))?;
        cart.add_item(NewCartItem {
            id: book.id,
            title: book.title,
            unit_price: book.price,
            image_url: book.image_url,
            author: book.author,
            product_type: book.product_type,
        });
        cart.update_quantity(book_id, item.quantity);
    }

    let shipping = match (req.shipping_address_id, req.shipping_address) {
        (Some(id), _) => Some(ShippingChoice::SavedAddress(AddressId::from_uuid(id))),
        (None, Some(input)) => Some(ShippingChoice::Inline(input)),
        (None, None) => None,
    };

    let outcome = state
        .checkout
        .checkout(&mut cart, claims.user_id, shipping)
        .await?;
    metrics::counter!("checkout_completed_total").increment(1);

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: outcome.order_id.to_string(),
            redirect_url: outcome.redirect_url,
        }),
    ))
}
