//! Persistence layer for the Furlong Field Press backend.
//!
//! Each resource gets its own store trait; the [`Store`] supertrait
//! bundles them so route handlers can stay generic over a single bound.
//! Two implementations are provided: [`PgStore`] backed by PostgreSQL
//! via sqlx, and [`MemoryStore`] for tests and local development.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    AddressStore, BookStore, ContactStore, GenreStore, NewsletterStore, OrderFilter, OrderStore,
    PodcastStore, Store, UserStore,
};
