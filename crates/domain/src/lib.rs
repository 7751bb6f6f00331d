//! Domain layer for the Furlong Field Press backend.
//!
//! Holds the value objects (money, roles, statuses), the flat entity
//! records managed by the admin CRUD surface, email validation, and the
//! shopping cart state container.

pub mod cart;
pub mod email;
pub mod money;
pub mod records;
pub mod types;

pub use cart::{CART_STORAGE_KEY, Cart, CartItem, CartSnapshot, NewCartItem};
pub use email::is_valid_email;
pub use money::Money;
pub use records::{
    Address, Book, Contact, Genre, Newsletter, Order, OrderItem, Podcast, User,
};
pub use types::{OrderStatus, ParseEnumError, ProductType, Role};
