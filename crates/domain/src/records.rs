//! Flat entity records managed by the admin CRUD surface.
//!
//! These mirror the relational tables one to one. Referential rules
//! (a book cannot be deleted while order items reference it, a genre
//! cannot be deleted while books reference it) are enforced by the
//! route handlers through pre-delete existence checks in the store.

use chrono::{DateTime, Utc};
use common::{
    AddressId, BookId, ContactId, GenreId, NewsletterId, OrderId, OrderItemId, PodcastId, UserId,
};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{OrderStatus, ProductType, Role};

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub description: Option<String>,
    pub price: Money,
    pub genre_id: GenreId,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub button_text: Option<String>,
    pub is_available: bool,
    pub is_featured: bool,
    pub product_type: ProductType,
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A book category with a display order used only for presentation sorting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A published podcast episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Podcast {
    pub id: PodcastId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered user, provisioned through the identity-provider webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Identifier assigned by the external identity provider.
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A contact-form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub email: String,
    pub name: String,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted purchase. Line items are immutable once created; only
/// the status transitions afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_price: Money,
    pub status: OrderStatus,
    pub has_physical_items: bool,
    pub shipping_address_id: Option<AddressId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single line item of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    /// Returns the total price for this line (quantity x unit price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    /// Full name of the recipient.
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A newsletter subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Newsletter {
    pub id: NewsletterId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
