//! Checkout orchestration.
//!
//! Turns a shopper's cart into a pending order and a payment session.
//! Payment collection itself belongs to an external provider behind the
//! [`PaymentSessionCreator`] seam; the [`CheckoutCoordinator`] owns the
//! ordering of validation, persistence, and session creation.

mod coordinator;
mod error;
mod payment;

pub use coordinator::{CheckoutCoordinator, CheckoutOutcome, ShippingAddressInput, ShippingChoice};
pub use error::CheckoutError;
pub use payment::{InMemoryPaymentGateway, PaymentSession, PaymentSessionCreator};
