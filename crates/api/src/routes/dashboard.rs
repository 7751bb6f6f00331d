//! Admin dashboard summary endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::require_admin;

const RECENT_ORDER_LIMIT: i64 = 5;

#[derive(Serialize)]
pub struct DashboardCounts {
    pub books: u64,
    pub genres: u64,
    pub podcasts: u64,
    pub users: u64,
    pub orders: u64,
    pub unread_contacts: u64,
}

#[derive(Serialize)]
pub struct RecentOrder {
    pub id: String,
    pub user_id: String,
    pub total_cents: i64,
    pub status: domain::OrderStatus,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub counts: DashboardCounts,
    pub recent_orders: Vec<RecentOrder>,
}

/// GET /api/dashboard - entity totals plus the most recent orders (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, ApiError> {
    require_admin(&state, &headers).await?;

    let counts = DashboardCounts {
        books: state.store.count_books().await?,
        genres: state.store.count_genres().await?,
        podcasts: state.store.count_podcasts().await?,
        users: state.store.count_users().await?,
        orders: state.store.count_orders().await?,
        unread_contacts: state.store.count_unread_contacts().await?,
    };

    let recent_orders = state
        .store
        .list_recent_orders(RECENT_ORDER_LIMIT)
        .await?
        .into_iter()
        .map(|order| RecentOrder {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            total_cents: order.total_price.cents(),
            status: order.status,
            created_at: order.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(DashboardResponse {
        counts,
        recent_orders,
    }))
}
