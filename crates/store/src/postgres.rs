use async_trait::async_trait;
use chrono::Utc;
use common::{
    AddressId, BookId, ContactId, GenreId, NewsletterId, OrderId, OrderItemId, PodcastId, UserId,
};
use domain::{
    Address, Book, Contact, Genre, Newsletter, Order, OrderItem, OrderStatus, Podcast, Role, User,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{
    AddressStore, BookStore, ContactStore, GenreStore, NewsletterStore, OrderFilter, OrderStore,
    PodcastStore, UserStore,
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn parse_column<T>(value: &str, kind: &'static str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| StoreError::CorruptRow(format!("{kind}: {e}")))
}

fn row_to_book(row: PgRow) -> Result<Book> {
    let product_type: String = row.try_get("product_type")?;
    Ok(Book {
        id: BookId::from_uuid(row.try_get::<Uuid, _>("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: domain::Money::from_cents(row.try_get("price_cents")?),
        genre_id: GenreId::from_uuid(row.try_get::<Uuid, _>("genre_id")?),
        author: row.try_get("author")?,
        image_url: row.try_get("image_url")?,
        button_text: row.try_get("button_text")?,
        is_available: row.try_get("is_available")?,
        is_featured: row.try_get("is_featured")?,
        product_type: parse_column(&product_type, "product_type")?,
        download_url: row.try_get("download_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_genre(row: PgRow) -> Result<Genre> {
    Ok(Genre {
        id: GenreId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        display_order: row.try_get("display_order")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_podcast(row: PgRow) -> Result<Podcast> {
    Ok(Podcast {
        id: PodcastId::from_uuid(row.try_get::<Uuid, _>("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        video_url: row.try_get("video_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_user(row: PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        external_id: row.try_get("external_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        role: parse_column(&role, "role")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_contact(row: PgRow) -> Result<Contact> {
    Ok(Contact {
        id: ContactId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        is_read: row.try_get("is_read")?,
        user_id: row
            .try_get::<Option<Uuid>, _>("user_id")?
            .map(UserId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        total_price: domain::Money::from_cents(row.try_get("total_price_cents")?),
        status: parse_column(&status, "status")?,
        has_physical_items: row.try_get("has_physical_items")?,
        shipping_address_id: row
            .try_get::<Option<Uuid>, _>("shipping_address_id")?
            .map(AddressId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        book_id: BookId::from_uuid(row.try_get::<Uuid, _>("book_id")?),
        quantity: quantity as u32,
        unit_price: domain::Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

fn row_to_address(row: PgRow) -> Result<Address> {
    Ok(Address {
        id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        name: row.try_get("name")?,
        street: row.try_get("street")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        zip_code: row.try_get("zip_code")?,
        country: row.try_get("country")?,
        phone: row.try_get("phone")?,
        is_default: row.try_get("is_default")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_newsletter(row: PgRow) -> Result<Newsletter> {
    Ok(Newsletter {
        id: NewsletterId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
    })
}

const BOOK_COLUMNS: &str = "id, title, description, price_cents, genre_id, author, image_url, \
     button_text, is_available, is_featured, product_type, download_url, created_at, updated_at";

#[async_trait]
impl BookStore for PgStore {
    async fn list_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_book).collect()
    }

    async fn list_featured_books(&self, limit: i64) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE is_featured AND is_available \
             ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_book).collect()
    }

    async fn list_books_in_genres(&self, genre_ids: &[GenreId]) -> Result<Vec<Book>> {
        let ids: Vec<Uuid> = genre_ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE is_available AND genre_id = ANY($1) \
             ORDER BY created_at DESC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_book).collect()
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_book).transpose()
    }

    async fn insert_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, description, price_cents, genre_id, author, image_url,
                               button_text, is_available, is_featured, product_type, download_url,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.price.cents())
        .bind(book.genre_id.as_uuid())
        .bind(&book.author)
        .bind(&book.image_url)
        .bind(&book.button_text)
        .bind(book.is_available)
        .bind(book.is_featured)
        .bind(book.product_type.as_str())
        .bind(&book.download_url)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_book(&self, book: &Book) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE books SET title = $2, description = $3, price_cents = $4, genre_id = $5,
                             author = $6, image_url = $7, button_text = $8, is_available = $9,
                             is_featured = $10, product_type = $11, download_url = $12,
                             updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.price.cents())
        .bind(book.genre_id.as_uuid())
        .bind(&book.author)
        .bind(&book.image_url)
        .bind(&book.button_text)
        .bind(book.is_available)
        .bind(book.is_featured)
        .bind(book.product_type.as_str())
        .bind(&book.download_url)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("book", book.id));
        }
        Ok(())
    }

    async fn delete_book(&self, id: BookId) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("book", id));
        }
        Ok(())
    }

    async fn book_has_order_items(&self, id: BookId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM order_items WHERE book_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn count_books(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_available_books_in_genre(&self, genre_id: GenreId) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE genre_id = $1 AND is_available")
                .bind(genre_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl GenreStore for PgStore {
    async fn list_genres(&self) -> Result<Vec<Genre>> {
        let rows = sqlx::query(
            "SELECT id, name, display_order, created_at, updated_at FROM genres \
             ORDER BY display_order ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_genre).collect()
    }

    async fn get_genre(&self, id: GenreId) -> Result<Option<Genre>> {
        let row = sqlx::query(
            "SELECT id, name, display_order, created_at, updated_at FROM genres WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_genre).transpose()
    }

    async fn get_genre_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let row = sqlx::query(
            "SELECT id, name, display_order, created_at, updated_at FROM genres WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_genre).transpose()
    }

    async fn find_genres_named_like(&self, fragment: &str) -> Result<Vec<Genre>> {
        let rows = sqlx::query(
            "SELECT id, name, display_order, created_at, updated_at FROM genres \
             WHERE name ILIKE '%' || $1 || '%'",
        )
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_genre).collect()
    }

    async fn insert_genre(&self, genre: &Genre) -> Result<()> {
        sqlx::query(
            "INSERT INTO genres (id, name, display_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(genre.id.as_uuid())
        .bind(&genre.name)
        .bind(genre.display_order)
        .bind(genre.created_at)
        .bind(genre.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_genre(&self, genre: &Genre) -> Result<()> {
        let result = sqlx::query(
            "UPDATE genres SET name = $2, display_order = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(genre.id.as_uuid())
        .bind(&genre.name)
        .bind(genre.display_order)
        .bind(genre.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("genre", genre.id));
        }
        Ok(())
    }

    async fn delete_genre(&self, id: GenreId) -> Result<()> {
        let result = sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("genre", id));
        }
        Ok(())
    }

    async fn genre_has_books(&self, id: GenreId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE genre_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    #[tracing::instrument(skip(self, ordered_ids), fields(count = ordered_ids.len()))]
    async fn reorder_genres(&self, ordered_ids: &[GenreId]) -> Result<()> {
        // A duplicate would leave a gap in the 0..n ordering, so the
        // list must be a set.
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(StoreError::InvalidArgument(format!(
                "genre {dup} appears more than once"
            )));
        }

        let mut tx = self.pool.begin().await?;

        // Verify every id exists before any write.
        let uuids: Vec<Uuid> = ordered_ids.iter().map(|id| id.as_uuid()).collect();
        let existing: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM genres WHERE id = ANY($1)")
            .bind(&uuids)
            .fetch_all(&mut *tx)
            .await?;
        if let Some(missing) = uuids.iter().find(|id| !existing.contains(id)) {
            return Err(StoreError::not_found("genre", missing));
        }

        let now = Utc::now();
        for (index, id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE genres SET display_order = $2, updated_at = $3 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(index as i32)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count_genres(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

const PODCAST_COLUMNS: &str = "id, title, description, image_url, video_url, created_at, updated_at";

#[async_trait]
impl PodcastStore for PgStore {
    async fn list_podcasts(&self) -> Result<Vec<Podcast>> {
        let rows = sqlx::query(&format!(
            "SELECT {PODCAST_COLUMNS} FROM podcasts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_podcast).collect()
    }

    async fn list_recent_podcasts(&self, limit: i64) -> Result<Vec<Podcast>> {
        let rows = sqlx::query(&format!(
            "SELECT {PODCAST_COLUMNS} FROM podcasts ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_podcast).collect()
    }

    async fn get_podcast(&self, id: PodcastId) -> Result<Option<Podcast>> {
        let row = sqlx::query(&format!(
            "SELECT {PODCAST_COLUMNS} FROM podcasts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_podcast).transpose()
    }

    async fn insert_podcast(&self, podcast: &Podcast) -> Result<()> {
        sqlx::query(
            "INSERT INTO podcasts (id, title, description, image_url, video_url, created_at, \
             updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(podcast.id.as_uuid())
        .bind(&podcast.title)
        .bind(&podcast.description)
        .bind(&podcast.image_url)
        .bind(&podcast.video_url)
        .bind(podcast.created_at)
        .bind(podcast.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_podcast(&self, podcast: &Podcast) -> Result<()> {
        let result = sqlx::query(
            "UPDATE podcasts SET title = $2, description = $3, image_url = $4, video_url = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(podcast.id.as_uuid())
        .bind(&podcast.title)
        .bind(&podcast.description)
        .bind(&podcast.image_url)
        .bind(&podcast.video_url)
        .bind(podcast.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("podcast", podcast.id));
        }
        Ok(())
    }

    async fn delete_podcast(&self, id: PodcastId) -> Result<()> {
        let result = sqlx::query("DELETE FROM podcasts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("podcast", id));
        }
        Ok(())
    }

    async fn count_podcasts(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM podcasts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

const USER_COLUMNS: &str = "id, external_id, email, name, role, created_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_user).collect()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_user).transpose()
    }

    async fn upsert_user(
        &self,
        external_id: &str,
        email: &str,
        name: Option<&str>,
    ) -> Result<User> {
        let now = Utc::now();
        // Existing rows stay untouched; only the insert path writes.
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, external_id, email, name, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(external_id)
        .bind(email)
        .bind(name)
        .bind(Role::User.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        row_to_user(row)
    }

    async fn count_users(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

const CONTACT_COLUMNS: &str =
    "id, email, name, subject, message, is_read, user_id, created_at, updated_at";

#[async_trait]
impl ContactStore for PgStore {
    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_contact).collect()
    }

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_contact).transpose()
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        sqlx::query(
            "INSERT INTO contacts (id, email, name, subject, message, is_read, user_id, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(contact.id.as_uuid())
        .bind(&contact.email)
        .bind(&contact.name)
        .bind(&contact.subject)
        .bind(&contact.message)
        .bind(contact.is_read)
        .bind(contact.user_id.map(|id| id.as_uuid()))
        .bind(contact.created_at)
        .bind(contact.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_contact(&self, id: ContactId) -> Result<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("contact", id));
        }
        Ok(())
    }

    async fn mark_contacts_read(&self, ids: &[ContactId], is_read: bool) -> Result<u64> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let result = sqlx::query(
            "UPDATE contacts SET is_read = $2, updated_at = $3 WHERE id = ANY($1)",
        )
        .bind(uuids)
        .bind(is_read)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_all_contacts_read(&self, is_read: bool) -> Result<u64> {
        let result = sqlx::query("UPDATE contacts SET is_read = $1, updated_at = $2")
            .bind(is_read)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_unread_contacts(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE NOT is_read")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

const ORDER_COLUMNS: &str = "id, user_id, total_price_cents, status, has_physical_items, \
     shipping_address_id, created_at, updated_at";

impl PgStore {
    async fn items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            "SELECT id, order_id, book_id, quantity, unit_price_cents FROM order_items \
             WHERE order_id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_order_item).collect()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<(Order, Vec<OrderItem>)>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;
        if filter.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query(&sql);
        if let Some(user_id) = filter.user_id {
            query = query.bind(user_id.as_uuid());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let order = row_to_order(&row)?;
            let items = self.items_for_order(order.id).await?;
            orders.push((order, items));
        }
        Ok(orders)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<(Order, Vec<OrderItem>)>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let order = row_to_order(&row)?;
                let items = self.items_for_order(order.id).await?;
                Ok(Some((order, items)))
            }
            None => Ok(None),
        }
    }

    async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_order).collect()
    }

    #[tracing::instrument(skip(self, order, items), fields(order_id = %order.id))]
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, user_id, total_price_cents, status, has_physical_items, \
             shipping_address_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.total_price.cents())
        .bind(order.status.as_str())
        .bind(order.has_physical_items)
        .bind(order.shipping_address_id.map(|id| id.as_uuid()))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, book_id, quantity, unit_price_cents) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.book_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let result =
            sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(status.as_str())
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        // Line items go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    async fn count_orders(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

const ADDRESS_COLUMNS: &str = "id, user_id, name, street, city, state, zip_code, country, phone, \
     is_default, created_at, updated_at";

#[async_trait]
impl AddressStore for PgStore {
    async fn get_address(&self, id: AddressId) -> Result<Option<Address>> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_address).transpose()
    }

    async fn insert_address(&self, address: &Address) -> Result<()> {
        sqlx::query(
            "INSERT INTO addresses (id, user_id, name, street, city, state, zip_code, country, \
             phone, is_default, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(address.id.as_uuid())
        .bind(address.user_id.as_uuid())
        .bind(&address.name)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .bind(&address.country)
        .bind(&address.phone)
        .bind(address.is_default)
        .bind(address.created_at)
        .bind(address.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_user_addresses(&self, user_id: UserId) -> Result<Vec<Address>> {
        let rows = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 \
             ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_address).collect()
    }
}

#[async_trait]
impl NewsletterStore for PgStore {
    async fn list_newsletters(&self) -> Result<Vec<Newsletter>> {
        let rows = sqlx::query(
            "SELECT id, email, created_at FROM newsletters ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_newsletter).collect()
    }

    async fn get_newsletter(&self, id: NewsletterId) -> Result<Option<Newsletter>> {
        let row = sqlx::query("SELECT id, email, created_at FROM newsletters WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_newsletter).transpose()
    }

    async fn get_newsletter_by_email(&self, email: &str) -> Result<Option<Newsletter>> {
        let row = sqlx::query("SELECT id, email, created_at FROM newsletters WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_newsletter).transpose()
    }

    async fn insert_newsletter(&self, newsletter: &Newsletter) -> Result<()> {
        sqlx::query("INSERT INTO newsletters (id, email, created_at) VALUES ($1, $2, $3)")
            .bind(newsletter.id.as_uuid())
            .bind(&newsletter.email)
            .bind(newsletter.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
