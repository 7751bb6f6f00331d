//! HTTP API server for the Furlong Field Press storefront.
//!
//! Exposes the catalog (books, genres, podcasts), contact and newsletter
//! intake, order management, the identity webhook, and checkout, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use auth::{SharedSecretWebhookVerifier, StaticSessionVerifier};
use axum::Router;
use axum::routing::get;
use checkout::{CheckoutCoordinator, InMemoryPaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub sessions: StaticSessionVerifier,
    pub webhook: Option<SharedSecretWebhookVerifier>,
    pub payments: InMemoryPaymentGateway,
    pub checkout: CheckoutCoordinator<S, InMemoryPaymentGateway>,
}

/// Creates the default application state over the given store.
///
/// The session verifier starts empty; sessions are registered out of band
/// (tests) or by whatever process provisions tokens in deployment.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    webhook_secret: Option<String>,
) -> Arc<AppState<S>> {
    let sessions = StaticSessionVerifier::new();
    let payments = InMemoryPaymentGateway::new();
    let checkout = CheckoutCoordinator::new(store.clone(), payments.clone());

    Arc::new(AppState {
        store,
        sessions,
        webhook: webhook_secret.map(SharedSecretWebhookVerifier::new),
        payments,
        checkout,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/books",
            get(routes::books::list::<S>)
                .post(routes::books::create::<S>)
                .put(routes::books::update::<S>)
                .delete(routes::books::remove::<S>),
        )
        .route(
            "/api/genres",
            get(routes::genres::list::<S>)
                .post(routes::genres::create::<S>)
                .put(routes::genres::update::<S>)
                .patch(routes::genres::reorder::<S>)
                .delete(routes::genres::remove::<S>),
        )
        .route(
            "/api/podcasts",
            get(routes::podcasts::list::<S>)
                .post(routes::podcasts::create::<S>)
                .put(routes::podcasts::update::<S>)
                .delete(routes::podcasts::remove::<S>),
        )
        .route("/api/users", get(routes::users::list::<S>))
        .route(
            "/api/contact",
            get(routes::contact::list::<S>)
                .post(routes::contact::create::<S>)
                .patch(routes::contact::mark_read::<S>)
                .delete(routes::contact::remove::<S>),
        )
        .route(
            "/api/orders",
            get(routes::orders::list::<S>)
                .post(routes::orders::create::<S>)
                .patch(routes::orders::update_status::<S>)
                .delete(routes::orders::remove::<S>),
        )
        .route(
            "/api/newsletter",
            get(routes::newsletter::list::<S>).post(routes::newsletter::subscribe::<S>),
        )
        .route("/api/dashboard", get(routes::dashboard::get::<S>))
        .route("/api/home", get(routes::home::get::<S>))
        .route("/api/webhook/clerk", axum::routing::post(routes::webhook::clerk::<S>))
        .route("/api/checkout", axum::routing::post(routes::checkout::create::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
