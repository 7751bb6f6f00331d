//! User listing endpoints (admin).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use common::UserId;
use domain::{Role, User};
use serde::Serialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{IdQuery, require_admin};

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            external_id: user.external_id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// GET /api/users - list all users, or one by `?id=` (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers).await?;

    match query.id {
        Some(id) => {
            let id = UserId::from_uuid(id);
            let user = state
                .store
                .get_user(id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
            Ok(Json(UserResponse::from(user)).into_response())
        }
        None => {
            let users = state.store.list_users().await?;
            let responses: Vec<UserResponse> =
                users.into_iter().map(UserResponse::from).collect();
            Ok(Json(responses).into_response())
        }
    }
}
