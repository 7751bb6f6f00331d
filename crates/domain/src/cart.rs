//! Shopping cart state container.
//!
//! The cart is an owned struct handed to whatever session context needs
//! it, with persistence going through an explicit snapshot boundary
//! rather than ambient global storage. None of the mutating operations
//! can fail; malformed input (a non-positive quantity) is normalized by
//! delegating to removal.

use common::BookId;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::ProductType;

/// Storage key under which the serialized cart snapshot is kept.
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// Item metadata supplied when adding a product to the cart.
///
/// Quantity is not part of the input; a first add always yields
/// quantity 1 and repeat adds increment it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub id: BookId,
    pub title: String,
    pub unit_price: Money,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub product_type: ProductType,
}

/// An item held in the cart together with its quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: BookId,
    pub title: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub product_type: ProductType,
}

impl CartItem {
    fn from_new(item: NewCartItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            unit_price: item.unit_price,
            quantity: 1,
            image_url: item.image_url,
            author: item.author,
            product_type: item.product_type,
        }
    }

    /// Returns quantity x unit price for this entry.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// The persisted shape of the cart: only the item list is durable,
/// aggregates are recomputed on restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
}

/// Client-held record of items a shopper intends to purchase.
///
/// Invariants: every present item has quantity >= 1, ids are unique,
/// and the aggregates always equal the sums over the item list. The
/// aggregates are recomputed eagerly after every mutation.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartItem>,
    total_items: u32,
    total_price: Money,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a cart from a snapshot, recomputing the aggregates
    /// from the restored item list.
    pub fn from_snapshot(snapshot: CartSnapshot) -> Self {
        let mut cart = Self {
            items: snapshot.items,
            total_items: 0,
            total_price: Money::zero(),
        };
        cart.recompute();
        cart
    }

    /// Captures the durable portion of the cart for persistence.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
        }
    }

    /// Adds a product to the cart. If an entry with the same id already
    /// exists its quantity is incremented by 1, otherwise the item is
    /// inserted with quantity 1. Always succeeds.
    pub fn add_item(&mut self, item: NewCartItem) {
        match self.items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => existing.quantity += 1,
            None => self.items.push(CartItem::from_new(item)),
        }
        self.recompute();
    }

    /// Removes the entry with the given id. No-op when absent.
    pub fn remove_item(&mut self, id: BookId) {
        self.items.retain(|item| item.id != id);
        self.recompute();
    }

    /// Sets the quantity of an existing entry. A quantity of zero or
    /// less removes the entry instead; values beyond `u32::MAX` saturate
    /// so a present entry always keeps a quantity of at least 1.
    pub fn update_quantity(&mut self, id: BookId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        self.recompute();
    }

    /// Empties the cart and zeroes the aggregates.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_items = 0;
        self.total_price = Money::zero();
    }

    /// Read-only lookup by id.
    pub fn get_item(&self, id: BookId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Iterates over the items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities over all items.
    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    /// Sum of quantity x unit price over all items.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// True if any item in the cart requires physical shipping.
    pub fn has_physical_items(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.product_type == ProductType::Physical)
    }

    fn recompute(&mut self) {
        self.total_items = self.items.iter().map(|item| item.quantity).sum();
        self.total_price = self.items.iter().map(CartItem::line_total).sum();
    }
}
