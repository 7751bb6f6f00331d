//! Shared typed identifiers used across the Furlong Field Press backend.

mod types;

pub use types::{
    AddressId, BookId, ContactId, GenreId, NewsletterId, OrderId, OrderItemId, PodcastId, UserId,
};
