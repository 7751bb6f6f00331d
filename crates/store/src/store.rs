use async_trait::async_trait;
use common::{AddressId, BookId, ContactId, GenreId, NewsletterId, OrderId, PodcastId, UserId};
use domain::{Address, Book, Contact, Genre, Newsletter, Order, OrderItem, OrderStatus, Podcast, User};

use crate::Result;

/// Optional filters for listing orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    /// Restrict to orders placed by this user.
    pub user_id: Option<UserId>,
    /// Restrict to orders in this status.
    pub status: Option<OrderStatus>,
}

/// Catalog books.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books, newest first.
    async fn list_books(&self) -> Result<Vec<Book>>;

    /// Featured and available books, newest first, up to `limit`.
    async fn list_featured_books(&self, limit: i64) -> Result<Vec<Book>>;

    /// Available books belonging to any of the given genres, newest first.
    async fn list_books_in_genres(&self, genre_ids: &[GenreId]) -> Result<Vec<Book>>;

    async fn get_book(&self, id: BookId) -> Result<Option<Book>>;

    async fn insert_book(&self, book: &Book) -> Result<()>;

    /// Replaces an existing book row. Fails with `NotFound` when absent.
    async fn update_book(&self, book: &Book) -> Result<()>;

    /// Deletes a book row. Fails with `NotFound` when absent. The
    /// referential pre-delete check lives in the caller, via
    /// [`BookStore::book_has_order_items`].
    async fn delete_book(&self, id: BookId) -> Result<()>;

    /// True if at least one order item references this book.
    async fn book_has_order_items(&self, id: BookId) -> Result<bool>;

    async fn count_books(&self) -> Result<u64>;

    /// Number of available books in a genre, for the home aggregate.
    async fn count_available_books_in_genre(&self, genre_id: GenreId) -> Result<u64>;
}

/// Book genres, ordered for presentation by `display_order`.
#[async_trait]
pub trait GenreStore: Send + Sync {
    /// All genres ordered by `display_order` ascending.
    async fn list_genres(&self) -> Result<Vec<Genre>>;

    async fn get_genre(&self, id: GenreId) -> Result<Option<Genre>>;

    /// Exact name lookup, used for duplicate-name checks.
    async fn get_genre_by_name(&self, name: &str) -> Result<Option<Genre>>;

    /// Case-insensitive substring match on the genre name.
    async fn find_genres_named_like(&self, fragment: &str) -> Result<Vec<Genre>>;

    async fn insert_genre(&self, genre: &Genre) -> Result<()>;

    async fn update_genre(&self, genre: &Genre) -> Result<()>;

    async fn delete_genre(&self, id: GenreId) -> Result<()>;

    /// True if at least one book references this genre.
    async fn genre_has_books(&self, id: GenreId) -> Result<bool>;

    /// Assigns `display_order = index` for each id, in list order,
    /// atomically. If any id does not exist the whole operation fails
    /// with `NotFound` and no row is written.
    async fn reorder_genres(&self, ordered_ids: &[GenreId]) -> Result<()>;

    async fn count_genres(&self) -> Result<u64>;
}

/// Podcast episodes.
#[async_trait]
pub trait PodcastStore: Send + Sync {
    /// All podcasts, newest first.
    async fn list_podcasts(&self) -> Result<Vec<Podcast>>;

    /// The most recent podcasts, up to `limit`.
    async fn list_recent_podcasts(&self, limit: i64) -> Result<Vec<Podcast>>;

    async fn get_podcast(&self, id: PodcastId) -> Result<Option<Podcast>>;

    async fn insert_podcast(&self, podcast: &Podcast) -> Result<()>;

    async fn update_podcast(&self, podcast: &Podcast) -> Result<()>;

    async fn delete_podcast(&self, id: PodcastId) -> Result<()>;

    async fn count_podcasts(&self) -> Result<u64>;
}

/// Registered users, provisioned through the identity-provider webhook.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Creates a user for the given external identity id, or returns
    /// the existing row untouched when one is already present.
    async fn upsert_user(
        &self,
        external_id: &str,
        email: &str,
        name: Option<&str>,
    ) -> Result<User>;

    async fn count_users(&self) -> Result<u64>;
}

/// Contact-form submissions.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// All submissions, newest first.
    async fn list_contacts(&self) -> Result<Vec<Contact>>;

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>>;

    async fn insert_contact(&self, contact: &Contact) -> Result<()>;

    async fn delete_contact(&self, id: ContactId) -> Result<()>;

    /// Sets the read flag on the given submissions. Returns the number
    /// of rows updated; unknown ids are skipped.
    async fn mark_contacts_read(&self, ids: &[ContactId], is_read: bool) -> Result<u64>;

    /// Sets the read flag on every submission. Returns the row count.
    async fn mark_all_contacts_read(&self, is_read: bool) -> Result<u64>;

    async fn count_unread_contacts(&self) -> Result<u64>;
}

/// Orders and their immutable line items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders matching the filter, newest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<(Order, Vec<OrderItem>)>>;

    async fn get_order(&self, id: OrderId) -> Result<Option<(Order, Vec<OrderItem>)>>;

    /// The most recent orders, up to `limit`, for the dashboard.
    async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>>;

    /// Inserts the order row together with all of its line items,
    /// atomically.
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()>;

    /// Transitions the order's status. Fails with `NotFound` when absent.
    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Deletes the order and its line items.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    async fn count_orders(&self) -> Result<u64>;
}

/// Saved shipping addresses.
#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn get_address(&self, id: AddressId) -> Result<Option<Address>>;

    async fn insert_address(&self, address: &Address) -> Result<()>;

    async fn list_user_addresses(&self, user_id: UserId) -> Result<Vec<Address>>;
}

/// Newsletter subscriptions.
#[async_trait]
pub trait NewsletterStore: Send + Sync {
    /// All subscriptions, newest first.
    async fn list_newsletters(&self) -> Result<Vec<Newsletter>>;

    async fn get_newsletter(&self, id: NewsletterId) -> Result<Option<Newsletter>>;

    /// Exact email lookup, used for the uniqueness check.
    async fn get_newsletter_by_email(&self, email: &str) -> Result<Option<Newsletter>>;

    async fn insert_newsletter(&self, newsletter: &Newsletter) -> Result<()>;
}

/// The full persistence surface. Route handlers stay generic over this
/// single bound; both `PgStore` and `MemoryStore` satisfy it.
pub trait Store:
    BookStore
    + GenreStore
    + PodcastStore
    + UserStore
    + ContactStore
    + OrderStore
    + AddressStore
    + NewsletterStore
{
}

impl<T> Store for T where
    T: BookStore
        + GenreStore
        + PodcastStore
        + UserStore
        + ContactStore
        + OrderStore
        + AddressStore
        + NewsletterStore
{
}
