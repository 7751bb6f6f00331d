//! The checkout coordinator.

use chrono::Utc;
use common::{AddressId, OrderId, OrderItemId, UserId};
use domain::{Address, Cart, Order, OrderItem, OrderStatus};
use serde::Deserialize;
use store::Store;

use crate::error::CheckoutError;
use crate::payment::PaymentSessionCreator;

/// Shipping address fields supplied inline at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingAddressInput {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddressInput {
    fn validate(&self) -> Result<(), CheckoutError> {
        let required: [(&'static str, &str); 6] = [
            ("name", &self.name),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CheckoutError::IncompleteShippingAddress { field });
            }
        }
        Ok(())
    }
}

/// How the shopper supplied a shipping address.
#[derive(Debug, Clone)]
pub enum ShippingChoice {
    /// Reuse a previously saved address.
    SavedAddress(AddressId),
    /// A new address entered during checkout.
    Inline(ShippingAddressInput),
}

/// The result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// The pending order created for this checkout.
    pub order_id: OrderId,
    /// Where to send the shopper to complete payment.
    pub redirect_url: String,
}

/// Orchestrates cart validation, order creation, and payment session setup.
///
/// The order is persisted as pending before the payment session is
/// requested. If the session request fails the order stays pending and
/// the cart is left untouched so the shopper can retry; the cart is
/// cleared only once the whole sequence succeeds.
#[derive(Debug, Clone)]
pub struct CheckoutCoordinator<S, P> {
    store: S,
    payments: P,
}

impl<S, P> CheckoutCoordinator<S, P>
where
    S: Store,
    P: PaymentSessionCreator,
{
    /// Creates a coordinator over the given store and payment gateway.
    pub fn new(store: S, payments: P) -> Self {
        Self { store, payments }
    }

    /// Runs checkout for the given cart and user.
    #[tracing::instrument(skip(self, cart, shipping), fields(user_id = %user_id, items = cart.total_items()))]
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        user_id: UserId,
        shipping: Option<ShippingChoice>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let has_physical = cart.has_physical_items();
        let shipping_address_id = if has_physical {
            let choice = shipping.ok_or(CheckoutError::ShippingAddressRequired)?;
            Some(self.resolve_shipping(user_id, choice).await?)
        } else {
            None
        };

        // Every cart entry must still refer to a purchasable book.
        for item in cart.items() {
            let book = self
                .store
                .get_book(item.id)
                .await?
                .ok_or(CheckoutError::BookUnavailable(item.id))?;
            if !book.is_available {
                return Err(CheckoutError::BookUnavailable(item.id));
            }
        }

        let now = Utc::now();
        let order_id = OrderId::new();
        let items: Vec<OrderItem> = cart
            .items()
            .map(|item| OrderItem {
                id: OrderItemId::new(),
                order_id,
                book_id: item.id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();
        let order = Order {
            id: order_id,
            user_id,
            total_price: cart.total_price(),
            status: OrderStatus::Pending,
            has_physical_items: has_physical,
            shipping_address_id,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_order(&order, &items).await?;

        let session = self
            .payments
            .create_session(order_id, order.total_price)
            .await?;

        tracing::info!(order_id = %order_id, session_id = %session.session_id, "checkout complete");
        cart.clear();

        Ok(CheckoutOutcome {
            order_id,
            redirect_url: session.url,
        })
    }

    async fn resolve_shipping(
        &self,
        user_id: UserId,
        choice: ShippingChoice,
    ) -> Result<AddressId, CheckoutError> {
        match choice {
            ShippingChoice::SavedAddress(id) => {
                let address = self
                    .store
                    .get_address(id)
                    .await?
                    .ok_or(CheckoutError::AddressNotFound)?;
                if address.user_id != user_id {
                    return Err(CheckoutError::AddressNotFound);
                }
                Ok(id)
            }
            ShippingChoice::Inline(input) => {
                input.validate()?;
                let now = Utc::now();
                let address = Address {
                    id: AddressId::new(),
                    user_id,
                    name: input.name,
                    street: input.street,
                    city: input.city,
                    state: input.state,
                    zip_code: input.zip_code,
                    country: input.country,
                    phone: input.phone,
                    is_default: false,
                    created_at: now,
                    updated_at: now,
                };
                self.store.insert_address(&address).await?;
                Ok(address.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::BookId;
    use domain::{Book, Money, NewCartItem, ProductType};
    use store::{AddressStore, BookStore, MemoryStore, OrderStore, UserStore};

    use crate::payment::InMemoryPaymentGateway;

    async fn seed_book(store: &MemoryStore, cents: i64, product_type: ProductType) -> Book {
        let now = Utc::now();
        let book = Book {
            id: BookId::new(),
            title: "Field Notes".to_string(),
            description: None,
            price: Money::from_cents(cents),
            genre_id: common::GenreId::new(),
            author: None,
            image_url: None,
            button_text: None,
            is_available: true,
            is_featured: false,
            product_type,
            download_url: None,
            created_at: now,
            updated_at: now,
        };
        store.insert_book(&book).await.unwrap();
        book
    }

    fn cart_entry(book: &Book) -> NewCartItem {
        NewCartItem {
            id: book.id,
            title: book.title.clone(),
            unit_price: book.price,
            image_url: None,
            author: None,
            product_type: book.product_type,
        }
    }

    fn shipping_input() -> ShippingAddressInput {
        ShippingAddressInput {
            name: "Reader".to_string(),
            street: "1 Lane".to_string(),
            city: "Town".to_string(),
            state: "TS".to_string(),
            zip_code: "12345".to_string(),
            country: "US".to_string(),
            phone: None,
        }
    }

    async fn setup() -> (
        MemoryStore,
        InMemoryPaymentGateway,
        CheckoutCoordinator<MemoryStore, InMemoryPaymentGateway>,
        UserId,
    ) {
        let store = MemoryStore::new();
        let gateway = InMemoryPaymentGateway::new();
        let coordinator = CheckoutCoordinator::new(store.clone(), gateway.clone());
        let user = store
            .upsert_user("clerk_checkout", "buyer@example.com", None)
            .await
            .unwrap();
        (store, gateway, coordinator, user.id)
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_any_side_effect() {
        let (store, gateway, coordinator, user_id) = setup().await;
        let mut cart = Cart::new();

        let result = coordinator.checkout(&mut cart, user_id, None).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(store.count_orders().await.unwrap(), 0);
        assert_eq!(gateway.session_count(), 0);
    }

    #[tokio::test]
    async fn physical_cart_requires_shipping() {
        let (store, gateway, coordinator, user_id) = setup().await;
        let book = seed_book(&store, 1500, ProductType::Physical).await;
        let mut cart = Cart::new();
        cart.add_item(cart_entry(&book));

        let result = coordinator.checkout(&mut cart, user_id, None).await;

        assert!(matches!(result, Err(CheckoutError::ShippingAddressRequired)));
        assert_eq!(store.count_orders().await.unwrap(), 0);
        assert_eq!(gateway.session_count(), 0);
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn incomplete_inline_address_fails_before_persistence() {
        let (store, gateway, coordinator, user_id) = setup().await;
        let book = seed_book(&store, 1500, ProductType::Physical).await;
        let mut cart = Cart::new();
        cart.add_item(cart_entry(&book));

        let mut input = shipping_input();
        input.city = "  ".to_string();
        let result = coordinator
            .checkout(&mut cart, user_id, Some(ShippingChoice::Inline(input)))
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::IncompleteShippingAddress { field: "city" })
        ));
        assert_eq!(store.count_orders().await.unwrap(), 0);
        assert_eq!(gateway.session_count(), 0);
    }

    #[tokio::test]
    async fn unavailable_book_blocks_checkout() {
        let (store, gateway, coordinator, user_id) = setup().await;
        let mut book = seed_book(&store, 900, ProductType::Digital).await;
        book.is_available = false;
        store.update_book(&book).await.unwrap();

        let mut cart = Cart::new();
        cart.add_item(cart_entry(&book));

        let result = coordinator.checkout(&mut cart, user_id, None).await;

        assert!(matches!(result, Err(CheckoutError::BookUnavailable(id)) if id == book.id));
        assert_eq!(store.count_orders().await.unwrap(), 0);
        assert_eq!(gateway.session_count(), 0);
    }

    #[tokio::test]
    async fn digital_only_checkout_needs_no_shipping() {
        let (store, gateway, coordinator, user_id) = setup().await;
        let book = seed_book(&store, 900, ProductType::Digital).await;
        let mut cart = Cart::new();
        cart.add_item(cart_entry(&book));

        let outcome = coordinator.checkout(&mut cart, user_id, None).await.unwrap();

        let (order, items) = store.get_order(outcome.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.has_physical_items);
        assert!(order.shipping_address_id.is_none());
        assert_eq!(items.len(), 1);
        assert!(cart.is_empty());
        assert_eq!(gateway.session_count(), 1);
    }

    #[tokio::test]
    async fn inline_address_is_saved_and_linked() {
        let (store, _gateway, coordinator, user_id) = setup().await;
        let book = seed_book(&store, 2100, ProductType::Physical).await;
        let mut cart = Cart::new();
        cart.add_item(cart_entry(&book));
        cart.add_item(cart_entry(&book));

        let outcome = coordinator
            .checkout(
                &mut cart,
                user_id,
                Some(ShippingChoice::Inline(shipping_input())),
            )
            .await
            .unwrap();

        let (order, items) = store.get_order(outcome.order_id).await.unwrap().unwrap();
        assert!(order.has_physical_items);
        assert_eq!(order.total_price, Money::from_cents(4200));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);

        let address_id = order.shipping_address_id.unwrap();
        let address = store.get_address(address_id).await.unwrap().unwrap();
        assert_eq!(address.user_id, user_id);
        assert_eq!(address.city, "Town");
        assert_eq!(store.list_user_addresses(user_id).await.unwrap().len(), 1);
        assert!(outcome.redirect_url.starts_with("https://pay.example/"));
    }

    #[tokio::test]
    async fn saved_address_of_another_user_is_rejected() {
        let (store, gateway, coordinator, user_id) = setup().await;
        let other = store
            .upsert_user("clerk_other", "other@example.com", None)
            .await
            .unwrap();
        let now = Utc::now();
        let foreign = Address {
            id: AddressId::new(),
            user_id: other.id,
            name: "Other".to_string(),
            street: "2 Lane".to_string(),
            city: "Elsewhere".to_string(),
            state: "EW".to_string(),
            zip_code: "99999".to_string(),
            country: "US".to_string(),
            phone: None,
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        store.insert_address(&foreign).await.unwrap();

        let book = seed_book(&store, 1500, ProductType::Physical).await;
        let mut cart = Cart::new();
        cart.add_item(cart_entry(&book));

        let result = coordinator
            .checkout(
                &mut cart,
                user_id,
                Some(ShippingChoice::SavedAddress(foreign.id)),
            )
            .await;

        assert!(matches!(result, Err(CheckoutError::AddressNotFound)));
        assert_eq!(store.count_orders().await.unwrap(), 0);
        assert_eq!(gateway.session_count(), 0);
    }

    #[tokio::test]
    async fn payment_failure_leaves_order_pending_and_cart_intact() {
        let (store, gateway, coordinator, user_id) = setup().await;
        gateway.set_fail_on_create(true);

        let book = seed_book(&store, 900, ProductType::Digital).await;
        let mut cart = Cart::new();
        cart.add_item(cart_entry(&book));

        let result = coordinator.checkout(&mut cart, user_id, None).await;

        assert!(matches!(result, Err(CheckoutError::PaymentGateway(_))));
        // The order was already persisted; it stays pending for retry.
        assert_eq!(store.count_orders().await.unwrap(), 1);
        assert!(!cart.is_empty());
        assert_eq!(gateway.session_count(), 0);
    }
}
