//! Payment session trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::Money;

use crate::error::CheckoutError;

/// A hosted payment session created with the provider.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    /// The session ID assigned by the payment provider.
    pub session_id: String,
    /// The URL the shopper is redirected to for payment.
    pub url: String,
}

/// Trait for creating hosted payment sessions.
#[async_trait]
pub trait PaymentSessionCreator: Send + Sync {
    /// Creates a payment session for an order.
    async fn create_session(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<PaymentSession, CheckoutError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sessions: HashMap<String, (OrderId, Money)>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next session create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of sessions created so far.
    pub fn session_count(&self) -> usize {
        self.state.read().unwrap().sessions.len()
    }

    /// Returns true if a session exists with the given ID.
    pub fn has_session(&self, session_id: &str) -> bool {
        self.state.read().unwrap().sessions.contains_key(session_id)
    }
}

#[async_trait]
impl PaymentSessionCreator for InMemoryPaymentGateway {
    async fn create_session(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<PaymentSession, CheckoutError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(CheckoutError::PaymentGateway(
                "session creation declined".to_string(),
            ));
        }

        state.next_id += 1;
        let session_id = format!("CS-{:04}", state.next_id);
        state
            .sessions
            .insert(session_id.clone(), (order_id, amount));

        Ok(PaymentSession {
            url: format!("https://pay.example/session/{session_id}"),
            session_id,
        })
    }
}
