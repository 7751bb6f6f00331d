//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency;
//! `#[serial]` keeps the TRUNCATE-based isolation sound.

use std::sync::Arc;

use chrono::Utc;
use common::{BookId, ContactId, GenreId, OrderId, OrderItemId, UserId};
use domain::{Book, Contact, Genre, Money, Order, OrderItem, OrderStatus, ProductType, Role};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    BookStore, ContactStore, GenreStore, NewsletterStore, OrderFilter, OrderStore, PgStore,
    StoreError, UserStore,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/0001_initial_schema.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PgStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query(
        "TRUNCATE TABLE order_items, orders, addresses, contacts, books, genres, users, \
         podcasts, newsletters",
    )
    .execute(&pool)
    .await
    .unwrap();

    PgStore::new(pool)
}

fn test_genre(name: &str, display_order: i32) -> Genre {
    let now = Utc::now();
    Genre {
        id: GenreId::new(),
        name: name.to_string(),
        display_order,
        created_at: now,
        updated_at: now,
    }
}

fn test_book(title: &str, genre_id: GenreId) -> Book {
    let now = Utc::now();
    Book {
        id: BookId::new(),
        title: title.to_string(),
        description: Some("A field guide".to_string()),
        price: Money::from_cents(1999),
        genre_id,
        author: Some("J. Furlong".to_string()),
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

fn test_order(user_id: UserId, books: &[&Book]) -> (Order, Vec<OrderItem>) {
    let now = Utc::now();
    let order_id = OrderId::new();
    let items: Vec<OrderItem> = books
        .iter()
        .map(|book| OrderItem {
            id: OrderItemId::new(),
            order_id,
            book_id: book.id,
            quantity: 1,
            unit_price: book.price,
        })
        .collect();
    let total = items.iter().map(|i| i.line_total()).sum();
    let order = Order {
        id: order_id,
        user_id,
        total_price: total,
        status: OrderStatus::Pending,
        has_physical_items: true,
        shipping_address_id: None,
        created_at: now,
        updated_at: now,
    };
    (order, items)
}

fn test_contact(email: &str) -> Contact {
    let now = Utc::now();
    Contact {
        id: ContactId::new(),
        email: email.to_string(),
        name: "Reader".to_string(),
        subject: None,
        message: "Do you ship overseas?".to_string(),
        is_read: false,
        user_id: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
#[serial]
async fn book_crud_roundtrip() {
    let store = get_test_store().await;

    let genre = test_genre("Fiction", 0);
    store.insert_genre(&genre).await.unwrap();

    let mut book = test_book("The Long Furrow", genre.id);
    store.insert_book(&book).await.unwrap();

    let fetched = store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "The Long Furrow");
    assert_eq!(fetched.price, Money::from_cents(1999));
    assert_eq!(fetched.product_type, ProductType::Physical);

    book.title = "The Longer Furrow".to_string();
    book.is_featured = true;
    store.update_book(&book).await.unwrap();

    let fetched = store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "The Longer Furrow");
    assert!(fetched.is_featured);

    store.delete_book(book.id).await.unwrap();
    assert!(store.get_book(book.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn featured_books_respect_availability_and_limit() {
    let store = get_test_store().await;

    let genre = test_genre("Fiction", 0);
    store.insert_genre(&genre).await.unwrap();

    for i in 0..6 {
        let mut book = test_book(&format!("Book {i}"), genre.id);
        book.is_featured = true;
        book.is_available = i != 0;
        store.insert_book(&book).await.unwrap();
    }

    let featured = store.list_featured_books(4).await.unwrap();
    assert_eq!(featured.len(), 4);
    assert!(featured.iter().all(|b| b.is_available && b.is_featured));
}

#[tokio::test]
#[serial]
async fn genres_list_by_display_order() {
    let store = get_test_store().await;

    store.insert_genre(&test_genre("Poetry", 2)).await.unwrap();
    store.insert_genre(&test_genre("Essays", 0)).await.unwrap();
    store.insert_genre(&test_genre("Fiction", 1)).await.unwrap();

    let genres = store.list_genres().await.unwrap();
    let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Essays", "Fiction", "Poetry"]);
}

#[tokio::test]
#[serial]
async fn reorder_genres_rewrites_display_order() {
    let store = get_test_store().await;

    let a = test_genre("A", 0);
    let b = test_genre("B", 1);
    let c = test_genre("C", 2);
    store.insert_genre(&a).await.unwrap();
    store.insert_genre(&b).await.unwrap();
    store.insert_genre(&c).await.unwrap();

    store.reorder_genres(&[c.id, a.id, b.id]).await.unwrap();

    let genres = store.list_genres().await.unwrap();
    let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["C", "A", "B"]);
}

#[tokio::test]
#[serial]
async fn reorder_genres_with_unknown_id_writes_nothing() {
    let store = get_test_store().await;

    let a = test_genre("A", 0);
    let b = test_genre("B", 1);
    store.insert_genre(&a).await.unwrap();
    store.insert_genre(&b).await.unwrap();

    let result = store.reorder_genres(&[b.id, GenreId::new(), a.id]).await;
    assert!(result.as_ref().is_err_and(|e| e.is_not_found()));

    // Order unchanged
    let genres = store.list_genres().await.unwrap();
    let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[tokio::test]
#[serial]
async fn reorder_genres_rejects_duplicate_ids() {
    let store = get_test_store().await;

    let a = test_genre("A", 0);
    let b = test_genre("B", 1);
    store.insert_genre(&a).await.unwrap();
    store.insert_genre(&b).await.unwrap();

    let result = store.reorder_genres(&[b.id, a.id, b.id]).await;
    assert!(matches!(result, Err(StoreError::InvalidArgument(_))));

    // Order unchanged
    let genres = store.list_genres().await.unwrap();
    let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[tokio::test]
#[serial]
async fn genre_name_lookup_is_case_insensitive_for_fragments() {
    let store = get_test_store().await;

    store
        .insert_genre(&test_genre("Natural History", 0))
        .await
        .unwrap();

    let exact = store.get_genre_by_name("Natural History").await.unwrap();
    assert!(exact.is_some());

    let matches = store.find_genres_named_like("natural").await.unwrap();
    assert_eq!(matches.len(), 1);

    let none = store.find_genres_named_like("cookery").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
#[serial]
async fn upsert_user_leaves_existing_row_untouched() {
    let store = get_test_store().await;

    let first = store
        .upsert_user("clerk_abc", "reader@example.com", Some("Reader One"))
        .await
        .unwrap();
    assert_eq!(first.role, Role::User);

    let second = store
        .upsert_user("clerk_abc", "other@example.com", Some("Someone Else"))
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.email, "reader@example.com");
    assert_eq!(second.name.as_deref(), Some("Reader One"));
    assert_eq!(store.count_users().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn insert_order_is_atomic_and_delete_cascades() {
    let store = get_test_store().await;

    let genre = test_genre("Fiction", 0);
    store.insert_genre(&genre).await.unwrap();
    let book_a = test_book("Book A", genre.id);
    let book_b = test_book("Book B", genre.id);
    store.insert_book(&book_a).await.unwrap();
    store.insert_book(&book_b).await.unwrap();

    let user = store
        .upsert_user("clerk_order", "buyer@example.com", None)
        .await
        .unwrap();

    let (order, items) = test_order(user.id, &[&book_a, &book_b]);
    store.insert_order(&order, &items).await.unwrap();

    let (fetched, fetched_items) = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(fetched.total_price, Money::from_cents(3998));
    assert_eq!(fetched.status, OrderStatus::Pending);
    assert_eq!(fetched_items.len(), 2);

    assert!(store.book_has_order_items(book_a.id).await.unwrap());

    store.delete_order(order.id).await.unwrap();
    assert!(store.get_order(order.id).await.unwrap().is_none());
    assert!(!store.book_has_order_items(book_a.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn order_filters_by_user_and_status() {
    let store = get_test_store().await;

    let genre = test_genre("Fiction", 0);
    store.insert_genre(&genre).await.unwrap();
    let book = test_book("Book", genre.id);
    store.insert_book(&book).await.unwrap();

    let alice = store
        .upsert_user("clerk_alice", "alice@example.com", None)
        .await
        .unwrap();
    let bob = store
        .upsert_user("clerk_bob", "bob@example.com", None)
        .await
        .unwrap();

    let (order_a, items_a) = test_order(alice.id, &[&book]);
    let (order_b, items_b) = test_order(bob.id, &[&book]);
    store.insert_order(&order_a, &items_a).await.unwrap();
    store.insert_order(&order_b, &items_b).await.unwrap();
    store
        .set_order_status(order_b.id, OrderStatus::Shipped)
        .await
        .unwrap();

    let alices = store
        .list_orders(OrderFilter {
            user_id: Some(alice.id),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].0.id, order_a.id);

    let shipped = store
        .list_orders(OrderFilter {
            user_id: None,
            status: Some(OrderStatus::Shipped),
        })
        .await
        .unwrap();
    assert_eq!(shipped.len(), 1);
    assert_eq!(shipped[0].0.id, order_b.id);
}

#[tokio::test]
#[serial]
async fn contact_read_flags() {
    let store = get_test_store().await;

    let first = test_contact("one@example.com");
    let second = test_contact("two@example.com");
    let third = test_contact("three@example.com");
    store.insert_contact(&first).await.unwrap();
    store.insert_contact(&second).await.unwrap();
    store.insert_contact(&third).await.unwrap();

    assert_eq!(store.count_unread_contacts().await.unwrap(), 3);

    let updated = store
        .mark_contacts_read(&[first.id, second.id], true)
        .await
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(store.count_unread_contacts().await.unwrap(), 1);

    let updated = store.mark_all_contacts_read(true).await.unwrap();
    assert_eq!(updated, 3);
    assert_eq!(store.count_unread_contacts().await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn newsletter_email_lookup() {
    let store = get_test_store().await;

    let entry = domain::Newsletter {
        id: common::NewsletterId::new(),
        email: "news@example.com".to_string(),
        created_at: Utc::now(),
    };
    store.insert_newsletter(&entry).await.unwrap();

    let found = store
        .get_newsletter_by_email("news@example.com")
        .await
        .unwrap();
    assert!(found.is_some());

    let missing = store
        .get_newsletter_by_email("absent@example.com")
        .await
        .unwrap();
    assert!(missing.is_none());

    // Unique index rejects a second signup for the same address
    let dup = domain::Newsletter {
        id: common::NewsletterId::new(),
        email: "news@example.com".to_string(),
        created_at: Utc::now(),
    };
    assert!(store.insert_newsletter(&dup).await.is_err());
}
