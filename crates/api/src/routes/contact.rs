//! Contact-form intake and admin inbox endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use common::ContactId;
use domain::{Contact, is_valid_email};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{IdQuery, authenticate_optional, require_admin};

#[derive(Serialize)]
pub struct ContactResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub user_id: Option<String>,
    pub created_at: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id.to_string(),
            email: contact.email,
            name: contact.name,
            subject: contact.subject,
            message: contact.message,
            is_read: contact.is_read,
            user_id: contact.user_id.map(|id| id.to_string()),
            created_at: contact.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct ContactRequest {
    pub email: String,
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Deserialize)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub ids: Vec<uuid::Uuid>,
    pub is_read: bool,
    #[serde(default)]
    pub update_all: bool,
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// GET /api/contact - list contact submissions (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    require_admin(&state, &headers).await?;

    let contacts = state.store.list_contacts().await?;
    Ok(Json(
        contacts.into_iter().map(ContactResponse::from).collect(),
    ))
}

/// POST /api/contact - submit the contact form. A valid session, when
/// present, links the submission to the user; anonymous is fine.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }
    if !is_valid_email(&req.email) {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }

    let claims = authenticate_optional(&state, &headers).await;

    let now = Utc::now();
    let contact = Contact {
        id: ContactId::new(),
        email: req.email,
        name: req.name,
        subject: req.subject,
        message: req.message,
        is_read: false,
        user_id: claims.map(|c| c.user_id),
        created_at: now,
        updated_at: now,
    };
    state.store.insert_contact(&contact).await?;

    Ok((StatusCode::CREATED, Json(ContactResponse::from(contact))))
}

/// PATCH /api/contact - bulk set read state by ids or for all (admin).
#[tracing::instrument(skip(state, headers, req))]
pub async fn mark_read<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    require_admin(&state, &headers).await?;

    let updated = if req.update_all {
        state.store.mark_all_contacts_read(req.is_read).await?
    } else {
        if req.ids.is_empty() {
            return Err(ApiError::BadRequest(
                "ids must not be empty unless update_all is set".to_string(),
            ));
        }
        let ids: Vec<ContactId> = req.ids.iter().copied().map(ContactId::from_uuid).collect();
        state.store.mark_contacts_read(&ids, req.is_read).await?
    };

    Ok(Json(MarkReadResponse { updated }))
}

/// DELETE /api/contact?id= - delete a contact submission (admin).
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    let id = ContactId::from_uuid(query.require()?);

    if state.store.get_contact(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("contact {id} not found")));
    }
    state.store.delete_contact(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
