//! Contact message inbox
//!
//! Expanding a `new` message marks it `viewed`; nothing moves it back.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use cpc_common::models::{ContactMessage, MessageStatus, Stored};
use cpc_common::store::{Collection, Document};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::views::{apply_filters, decode_listing, ListQuery, ListResponse, StatusFilter};
use crate::AppState;

pub type MessageList = ListResponse<Stored<ContactMessage>>;

#[derive(Debug, Serialize)]
pub struct ExpandResponse {
    pub message: Stored<ContactMessage>,
    #[serde(flatten)]
    pub listing: MessageList,
}

async fn message_listing(state: &AppState, user: &CurrentUser, query: &ListQuery) -> ApiResult<MessageList> {
    let status = StatusFilter::<MessageStatus>::parse(query.status.as_deref())?;
    let records = match user.department_scope() {
        Some(code) => {
            state
                .store
                .list_where(Collection::ContactSubmissions, "departmentCode", code)
                .await?
        }
        None => state.store.list_all(Collection::ContactSubmissions).await?,
    };
    let messages = decode_listing::<ContactMessage>(records);
    Ok(ListResponse::new(apply_filters(
        messages,
        query.search.as_deref(),
        status,
    )))
}

async fn load_message(state: &AppState, user: &CurrentUser, id: &str) -> ApiResult<Stored<ContactMessage>> {
    let record = state
        .store
        .get(Collection::ContactSubmissions, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Message {}", id)))?;
    let message = Stored::<ContactMessage>::from_record(record)?;
    user.ensure_in_scope(message.data.department_code.as_deref())?;
    Ok(message)
}

/// new -> viewed; already viewed messages are left untouched
async fn mark_viewed(state: &AppState, mut message: Stored<ContactMessage>) -> ApiResult<Stored<ContactMessage>> {
    if message.data.status == MessageStatus::New {
        let mut changes = Document::new();
        changes.insert("status".to_string(), json!(MessageStatus::Viewed));
        state
            .store
            .update(Collection::ContactSubmissions, &message.id, changes)
            .await?;
        message.data.status = MessageStatus::Viewed;
        info!(message_id = %message.id, "Message viewed");
    }
    Ok(message)
}

/// GET /api/messages
pub async fn list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<MessageList>> {
    Ok(Json(message_listing(&state, &user, &query).await?))
}

/// POST /api/messages/:id/expand
pub async fn expand_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ExpandResponse>> {
    let message = load_message(&state, &user, &id).await?;
    let message = mark_viewed(&state, message).await?;
    let listing = message_listing(&state, &user, &query).await?;
    Ok(Json(ExpandResponse { message, listing }))
}

/// POST /api/messages/:id/mark-viewed
pub async fn mark_message_viewed(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<MessageList>> {
    let message = load_message(&state, &user, &id).await?;
    mark_viewed(&state, message).await?;
    Ok(Json(message_listing(&state, &user, &query).await?))
}

/// DELETE /api/messages/:id
pub async fn delete_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<MessageList>> {
    load_message(&state, &user, &id).await?;
    state.store.delete(Collection::ContactSubmissions, &id).await?;
    info!(message_id = %id, admin_id = %user.id, "Deleted message");

    Ok(Json(message_listing(&state, &user, &query).await?))
}
