use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{AddressId, BookId, ContactId, GenreId, NewsletterId, OrderId, PodcastId, UserId};
use domain::{
    Address, Book, Contact, Genre, Newsletter, Order, OrderItem, OrderStatus, Podcast, Role, User,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{
    AddressStore, BookStore, ContactStore, GenreStore, NewsletterStore, OrderFilter, OrderStore,
    PodcastStore, UserStore,
};

#[derive(Default)]
struct Inner {
    books: Vec<Book>,
    genres: Vec<Genre>,
    podcasts: Vec<Podcast>,
    users: Vec<User>,
    contacts: Vec<Contact>,
    orders: Vec<(Order, Vec<OrderItem>)>,
    addresses: Vec<Address>,
    newsletters: Vec<Newsletter>,
}

/// In-memory store implementation for tests and local development.
///
/// Rows are kept in insertion order; "newest first" listings are the
/// reverse of that order. Provides the same interface and semantics as
/// the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        *inner = Inner::default();
    }
}

fn newest_first<T: Clone>(rows: &[T]) -> Vec<T> {
    rows.iter().rev().cloned().collect()
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list_books(&self) -> Result<Vec<Book>> {
        Ok(newest_first(&self.inner.read().await.books))
    }

    async fn list_featured_books(&self, limit: i64) -> Result<Vec<Book>> {
        let inner = self.inner.read().await;
        Ok(inner
            .books
            .iter()
            .rev()
            .filter(|b| b.is_featured && b.is_available)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_books_in_genres(&self, genre_ids: &[GenreId]) -> Result<Vec<Book>> {
        let inner = self.inner.read().await;
        Ok(inner
            .books
            .iter()
            .rev()
            .filter(|b| b.is_available && genre_ids.contains(&b.genre_id))
            .cloned()
            .collect())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let inner = self.inner.read().await;
        Ok(inner.books.iter().find(|b| b.id == id).cloned())
    }

    async fn insert_book(&self, book: &Book) -> Result<()> {
        self.inner.write().await.books.push(book.clone());
        Ok(())
    }

    async fn update_book(&self, book: &Book) -> Result<()> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .books
            .iter_mut()
            .find(|b| b.id == book.id)
            .ok_or_else(|| StoreError::not_found("book", book.id))?;
        *slot = book.clone();
        Ok(())
    }

    async fn delete_book(&self, id: BookId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.books.len();
        inner.books.retain(|b| b.id != id);
        if inner.books.len() == before {
            return Err(StoreError::not_found("book", id));
        }
        Ok(())
    }

    async fn book_has_order_items(&self, id: BookId) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .flat_map(|(_, items)| items)
            .any(|item| item.book_id == id))
    }

    async fn count_books(&self) -> Result<u64> {
        Ok(self.inner.read().await.books.len() as u64)
    }

    async fn count_available_books_in_genre(&self, genre_id: GenreId) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .books
            .iter()
            .filter(|b| b.is_available && b.genre_id == genre_id)
            .count() as u64)
    }
}

#[async_trait]
impl GenreStore for MemoryStore {
    async fn list_genres(&self) -> Result<Vec<Genre>> {
        let inner = self.inner.read().await;
        let mut genres = inner.genres.clone();
        genres.sort_by_key(|g| g.display_order);
        Ok(genres)
    }

    async fn get_genre(&self, id: GenreId) -> Result<Option<Genre>> {
        let inner = self.inner.read().await;
        Ok(inner.genres.iter().find(|g| g.id == id).cloned())
    }

    async fn get_genre_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let inner = self.inner.read().await;
        Ok(inner.genres.iter().find(|g| g.name == name).cloned())
    }

    async fn find_genres_named_like(&self, fragment: &str) -> Result<Vec<Genre>> {
        let needle = fragment.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .genres
            .iter()
            .filter(|g| g.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn insert_genre(&self, genre: &Genre) -> Result<()> {
        self.inner.write().await.genres.push(genre.clone());
        Ok(())
    }

    async fn update_genre(&self, genre: &Genre) -> Result<()> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .genres
            .iter_mut()
            .find(|g| g.id == genre.id)
            .ok_or_else(|| StoreError::not_found("genre", genre.id))?;
        *slot = genre.clone();
        Ok(())
    }

    async fn delete_genre(&self, id: GenreId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.genres.len();
        inner.genres.retain(|g| g.id != id);
        if inner.genres.len() == before {
            return Err(StoreError::not_found("genre", id));
        }
        Ok(())
    }

    async fn genre_has_books(&self, id: GenreId) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.books.iter().any(|b| b.genre_id == id))
    }

    async fn reorder_genres(&self, ordered_ids: &[GenreId]) -> Result<()> {
        let mut inner = self.inner.write().await;

        // Validate every id before touching any row. A duplicate would
        // leave a gap in the 0..n ordering, so the list must be a set.
        let mut seen = std::collections::HashSet::new();
        for id in ordered_ids {
            if !seen.insert(*id) {
                return Err(StoreError::InvalidArgument(format!(
                    "genre {id} appears more than once"
                )));
            }
            if !inner.genres.iter().any(|g| g.id == *id) {
                return Err(StoreError::not_found("genre", *id));
            }
        }

        let now = Utc::now();
        for (index, id) in ordered_ids.iter().enumerate() {
            if let Some(genre) = inner.genres.iter_mut().find(|g| g.id == *id) {
                genre.display_order = index as i32;
                genre.updated_at = now;
            }
        }
        Ok(())
    }

    async fn count_genres(&self) -> Result<u64> {
        Ok(self.inner.read().await.genres.len() as u64)
    }
}

#[async_trait]
impl PodcastStore for MemoryStore {
    async fn list_podcasts(&self) -> Result<Vec<Podcast>> {
        Ok(newest_first(&self.inner.read().await.podcasts))
    }

    async fn list_recent_podcasts(&self, limit: i64) -> Result<Vec<Podcast>> {
        let inner = self.inner.read().await;
        Ok(inner
            .podcasts
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_podcast(&self, id: PodcastId) -> Result<Option<Podcast>> {
        let inner = self.inner.read().await;
        Ok(inner.podcasts.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_podcast(&self, podcast: &Podcast) -> Result<()> {
        self.inner.write().await.podcasts.push(podcast.clone());
        Ok(())
    }

    async fn update_podcast(&self, podcast: &Podcast) -> Result<()> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .podcasts
            .iter_mut()
            .find(|p| p.id == podcast.id)
            .ok_or_else(|| StoreError::not_found("podcast", podcast.id))?;
        *slot = podcast.clone();
        Ok(())
    }

    async fn delete_podcast(&self, id: PodcastId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.podcasts.len();
        inner.podcasts.retain(|p| p.id != id);
        if inner.podcasts.len() == before {
            return Err(StoreError::not_found("podcast", id));
        }
        Ok(())
    }

    async fn count_podcasts(&self) -> Result<u64> {
        Ok(self.inner.read().await.podcasts.len() as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(newest_first(&self.inner.read().await.users))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn upsert_user(
        &self,
        external_id: &str,
        email: &str,
        name: Option<&str>,
    ) -> Result<User> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.users.iter().find(|u| u.external_id == external_id) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            external_id: external_id.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.inner.read().await.users.len() as u64)
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        Ok(newest_first(&self.inner.read().await.contacts))
    }

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>> {
        let inner = self.inner.read().await;
        Ok(inner.contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        self.inner.write().await.contacts.push(contact.clone());
        Ok(())
    }

    async fn delete_contact(&self, id: ContactId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.contacts.len();
        inner.contacts.retain(|c| c.id != id);
        if inner.contacts.len() == before {
            return Err(StoreError::not_found("contact", id));
        }
        Ok(())
    }

    async fn mark_contacts_read(&self, ids: &[ContactId], is_read: bool) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut updated = 0;
        for contact in inner.contacts.iter_mut() {
            if ids.contains(&contact.id) {
                contact.is_read = is_read;
                contact.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn mark_all_contacts_read(&self, is_read: bool) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        for contact in inner.contacts.iter_mut() {
            contact.is_read = is_read;
            contact.updated_at = now;
        }
        Ok(inner.contacts.len() as u64)
    }

    async fn count_unread_contacts(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.contacts.iter().filter(|c| !c.is_read).count() as u64)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<(Order, Vec<OrderItem>)>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .rev()
            .filter(|(order, _)| {
                filter.user_id.is_none_or(|uid| order.user_id == uid)
                    && filter.status.is_none_or(|s| order.status == s)
            })
            .cloned()
            .collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<(Order, Vec<OrderItem>)>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.iter().find(|(o, _)| o.id == id).cloned())
    }

    async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .rev()
            .take(limit as usize)
            .map(|(order, _)| order.clone())
            .collect())
    }

    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
        self.inner
            .write()
            .await
            .orders
            .push((order.clone(), items.to_vec()));
        Ok(())
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let (order, _) = inner
            .orders
            .iter_mut()
            .find(|(o, _)| o.id == id)
            .ok_or_else(|| StoreError::not_found("order", id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.orders.len();
        inner.orders.retain(|(o, _)| o.id != id);
        if inner.orders.len() == before {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    async fn count_orders(&self) -> Result<u64> {
        Ok(self.inner.read().await.orders.len() as u64)
    }
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn get_address(&self, id: AddressId) -> Result<Option<Address>> {
        let inner = self.inner.read().await;
        Ok(inner.addresses.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_address(&self, address: &Address) -> Result<()> {
        self.inner.write().await.addresses.push(address.clone());
        Ok(())
    }

    async fn list_user_addresses(&self, user_id: UserId) -> Result<Vec<Address>> {
        let inner = self.inner.read().await;
        Ok(inner
            .addresses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NewsletterStore for MemoryStore {
    async fn list_newsletters(&self) -> Result<Vec<Newsletter>> {
        Ok(newest_first(&self.inner.read().await.newsletters))
    }

    async fn get_newsletter(&self, id: NewsletterId) -> Result<Option<Newsletter>> {
        let inner = self.inner.read().await;
        Ok(inner.newsletters.iter().find(|n| n.id == id).cloned())
    }

    async fn get_newsletter_by_email(&self, email: &str) -> Result<Option<Newsletter>> {
        let inner = self.inner.read().await;
        Ok(inner.newsletters.iter().find(|n| n.email == email).cloned())
    }

    async fn insert_newsletter(&self, newsletter: &Newsletter) -> Result<()> {
        self.inner.write().await.newsletters.push(newsletter.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, ProductType};

    fn genre(name: &str, order: i32) -> Genre {
        let now = Utc::now();
        Genre {
            id: GenreId::new(),
            name: name.to_string(),
            display_order: order,
            created_at: now,
            updated_at: now,
        }
    }

    fn book(genre_id: GenreId) -> Book {
        let now = Utc::now();
        Book {
            id: BookId::new(),
            title: "Field Notes".to_string(),
            description: None,
            price: Money::from_cents(1999),
            genre_id,
            author: None,
            image_url: None,
            button_text: None,
            is_available: true,
            is_featured: false,
            product_type: ProductType::Physical,
            download_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn reorder_assigns_sequential_display_orders() {
        let store = MemoryStore::new();
        let a = genre("a", 0);
        let b = genre("b", 1);
        let c = genre("c", 2);
        for g in [&a, &b, &c] {
            store.insert_genre(g).await.unwrap();
        }

        store.reorder_genres(&[b.id, a.id, c.id]).await.unwrap();

        assert_eq!(store.get_genre(b.id).await.unwrap().unwrap().display_order, 0);
        assert_eq!(store.get_genre(a.id).await.unwrap().unwrap().display_order, 1);
        assert_eq!(store.get_genre(c.id).await.unwrap().unwrap().display_order, 2);

        let listed = store.list_genres().await.unwrap();
        assert_eq!(listed[0].name, "b");
        assert_eq!(listed[1].name, "a");
        assert_eq!(listed[2].name, "c");
    }

    #[tokio::test]
    async fn reorder_with_unknown_id_changes_nothing() {
        let store = MemoryStore::new();
        let a = genre("a", 0);
        let b = genre("b", 1);
        store.insert_genre(&a).await.unwrap();
        store.insert_genre(&b).await.unwrap();

        let result = store.reorder_genres(&[b.id, GenreId::new(), a.id]).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        assert_eq!(store.get_genre(a.id).await.unwrap().unwrap().display_order, 0);
        assert_eq!(store.get_genre(b.id).await.unwrap().unwrap().display_order, 1);
    }

    #[tokio::test]
    async fn reorder_with_duplicate_id_changes_nothing() {
        let store = MemoryStore::new();
        let a = genre("a", 0);
        let b = genre("b", 1);
        store.insert_genre(&a).await.unwrap();
        store.insert_genre(&b).await.unwrap();

        let result = store.reorder_genres(&[b.id, a.id, b.id]).await;
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));

        assert_eq!(store.get_genre(a.id).await.unwrap().unwrap().display_order, 0);
        assert_eq!(store.get_genre(b.id).await.unwrap().unwrap().display_order, 1);
    }

    #[tokio::test]
    async fn book_referenced_by_order_item_is_detected() {
        let store = MemoryStore::new();
        let g = genre("fiction", 0);
        store.insert_genre(&g).await.unwrap();
        let b = book(g.id);
        store.insert_book(&b).await.unwrap();

        assert!(!store.book_has_order_items(b.id).await.unwrap());

        let user = store.upsert_user("ext_1", "u@example.com", None).await.unwrap();
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            user_id: user.id,
            total_price: Money::from_cents(1999),
            status: OrderStatus::Pending,
            has_physical_items: true,
            shipping_address_id: None,
            created_at: now,
            updated_at: now,
        };
        let item = OrderItem {
            id: common::OrderItemId::new(),
            order_id: order.id,
            book_id: b.id,
            quantity: 1,
            unit_price: b.price,
        };
        store.insert_order(&order, &[item]).await.unwrap();

        assert!(store.book_has_order_items(b.id).await.unwrap());
    }

    #[tokio::test]
    async fn upsert_user_is_idempotent() {
        let store = MemoryStore::new();
        let first = store
            .upsert_user("ext_9", "a@example.com", Some("Ada"))
            .await
            .unwrap();
        let second = store
            .upsert_user("ext_9", "changed@example.com", None)
            .await
            .unwrap();

        // Existing row is returned untouched.
        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "a@example.com");
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_contacts_read_counts_matches_only() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut ids = Vec::new();
        for i in 0..3 {
            let contact = Contact {
                id: ContactId::new(),
                email: format!("reader{i}@example.com"),
                name: "Reader".to_string(),
                subject: None,
                message: "hello".to_string(),
                is_read: false,
                user_id: None,
                created_at: now,
                updated_at: now,
            };
            store.insert_contact(&contact).await.unwrap();
            ids.push(contact.id);
        }

        let updated = store
            .mark_contacts_read(&[ids[0], ContactId::new()], true)
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(store.count_unread_contacts().await.unwrap(), 2);

        let all = store.mark_all_contacts_read(true).await.unwrap();
        assert_eq!(all, 3);
        assert_eq!(store.count_unread_contacts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn order_filters_by_user_and_status() {
        let store = MemoryStore::new();
        let alice = store.upsert_user("ext_a", "a@example.com", None).await.unwrap();
        let bob = store.upsert_user("ext_b", "b@example.com", None).await.unwrap();

        let now = Utc::now();
        for (user, status) in [
            (&alice, OrderStatus::Pending),
            (&alice, OrderStatus::Shipped),
            (&bob, OrderStatus::Pending),
        ] {
            let order = Order {
                id: OrderId::new(),
                user_id: user.id,
                total_price: Money::from_cents(100),
                status,
                has_physical_items: false,
                shipping_address_id: None,
                created_at: now,
                updated_at: now,
            };
            store.insert_order(&order, &[]).await.unwrap();
        }

        let alices = store
            .list_orders(OrderFilter {
                user_id: Some(alice.id),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(alices.len(), 2);

        let pending = store
            .list_orders(OrderFilter {
                user_id: None,
                status: Some(OrderStatus::Pending),
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
    }
}
