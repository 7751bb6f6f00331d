//! Order listing and admin management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::{BookId, OrderId, OrderItemId, UserId};
use domain::{Money, Order, OrderItem, OrderStatus, ProductType};
use serde::{Deserialize, Serialize};
use store::{OrderFilter, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{IdQuery, authenticate, require_admin};

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub book_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id.to_string(),
            book_id: item.book_id.to_string(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            line_total_cents: item.line_total().cents(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub has_physical_items: bool,
    pub shipping_address_id: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: String,
}

impl OrderResponse {
    fn build(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            total_cents: order.total_price.cents(),
            status: order.status,
            has_physical_items: order.has_physical_items,
            shipping_address_id: order.shipping_address_id.map(|id| id.to_string()),
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub id: Option<uuid::Uuid>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub id: uuid::Uuid,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CreateOrderItem {
    pub book_id: uuid::Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// Defaults to the caller. Only admins may order on behalf of others.
    pub user_id: Option<uuid::Uuid>,
    pub items: Vec<CreateOrderItem>,
}

fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid order status: {raw}")))
}

/// GET /api/orders - list orders. Admins see everything (optionally
/// filtered by `?status=`); everyone else sees only their own. `?id=`
/// fetches a single order; a foreign order is a 403 for non-admins.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<OrderQuery>,
) -> Result<Response, ApiError> {
    let claims = authenticate(&state, &headers).await?;

    if let Some(id) = query.id {
        let id = OrderId::from_uuid(id);
        let (order, items) = state
            .store
            .get_order(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
        if !claims.is_admin() && order.user_id != claims.user_id {
            return Err(ApiError::Forbidden(
                "order belongs to another user".to_string(),
            ));
        }
        return Ok(Json(OrderResponse::build(order, items)).into_response());
    }

    let status = query.status.as_deref().map(parse_status).transpose()?;
    let filter = if claims.is_admin() {
        OrderFilter {
            user_id: None,
            status,
        }
    } else {
        OrderFilter {
            user_id: Some(claims.user_id),
            status,
        }
    };

    let orders = state.store.list_orders(filter).await?;
    let responses: Vec<OrderResponse> = orders
        .into_iter()
        .map(|(order, items)| OrderResponse::build(order, items))
        .collect();
    Ok(Json(responses).into_response())
}

/// POST /api/orders - create a pending order directly, pricing each line
/// from the catalog. Non-admins can only order for themselves.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let claims = authenticate(&state, &headers).await?;

    if req.items.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one order item is required".to_string(),
        ));
    }

    let user_id = match req.user_id {
        Some(id) => {
            let id = UserId::from_uuid(id);
            if !claims.is_admin() && id != claims.user_id {
                return Err(ApiError::Forbidden(
                    "cannot create orders for another user".to_string(),
                ));
            }
            id
        }
        None => claims.user_id,
    };

    let order_id = OrderId::new();
    let mut items = Vec::with_capacity(req.items.len());
    let mut total = Money::zero();
    let mut has_physical_items = false;
    for line in &req.items {
        let book_id = BookId::from_uuid(line.book_id);
        let book = state
            .store
            .get_book(book_id)
            .await?
            .filter(|b| b.is_available)
            .ok_or_else(|| {
                ApiError::BadRequest(format!("book {book_id} is not available"))
            })?;
        if line.quantity == 0 {
            return Err(ApiError::BadRequest(
                "item quantity must be at least 1".to_string(),
            ));
        }
        has_physical_items |= book.product_type == ProductType::Physical;
        let item = OrderItem {
            id: OrderItemId::new(),
            order_id,
            book_id,
            quantity: line.quantity,
            unit_price: book.price,
        };
        total = total + item.line_total();
        items.push(item);
    }

    let now = Utc::now();
    let order = Order {
        id: order_id,
        user_id,
        total_price: total,
        status: OrderStatus::Pending,
        has_physical_items,
        shipping_address_id: None,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_order(&order, &items).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::build(order, items)),
    ))
}

/// PATCH /api/orders - set an order's status (admin).
#[tracing::instrument(skip(state, headers, req))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    require_admin(&state, &headers).await?;

    let id = OrderId::from_uuid(req.id);
    let status = parse_status(&req.status)?;
    state.store.set_order_status(id, status).await?;

    let (order, items) = state
        .store
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
    Ok(Json(OrderResponse::build(order, items)))
}

/// DELETE /api/orders?id= - delete an order and its line items (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    let id = OrderId::from_uuid(query.require()?);

    state.store.delete_order(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
