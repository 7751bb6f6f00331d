use common::BookId;
use thiserror::Error;

/// Errors raised while turning a cart into an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was attempted with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// The cart holds physical items but no shipping address was given.
    #[error("shipping address required for physical items")]
    ShippingAddressRequired,

    /// An inline shipping address was missing a required field.
    #[error("shipping address missing field: {field}")]
    IncompleteShippingAddress { field: &'static str },

    /// The referenced saved address does not exist or belongs to another user.
    #[error("shipping address not found")]
    AddressNotFound,

    /// A cart item refers to a book that is missing or not for sale.
    #[error("book {0} is not available")]
    BookUnavailable(BookId),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),

    /// The payment provider could not create a session.
    #[error("payment gateway error: {0}")]
    PaymentGateway(String),
}
