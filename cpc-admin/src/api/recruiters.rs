//! Recruiter management view and signup
//!
//! Any admin may list recruiters; only unrestricted admins change them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cpc_common::models::{to_document, ProfileStatus, RecruiterProfile, Role, Stored};
use cpc_common::store::{Collection, Document};
use cpc_common::validation::RecruiterForm;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::signup::{provision_recruiter, RecruiterSignup};
use crate::views::{apply_filters, decode_listing, ListQuery, ListResponse, StatusFilter};
use crate::AppState;

pub type RecruiterList = ListResponse<Stored<RecruiterProfile>>;

async fn recruiter_listing(state: &AppState, query: &ListQuery) -> ApiResult<RecruiterList> {
    let status = StatusFilter::<ProfileStatus>::parse(query.status.as_deref())?;
    let records = state.store.list_all(Collection::Recruiters).await?;
    let recruiters = decode_listing::<RecruiterProfile>(records);
    Ok(ListResponse::new(apply_filters(
        recruiters,
        query.search.as_deref(),
        status,
    )))
}

async fn load_recruiter(state: &AppState, id: &str) -> ApiResult<Stored<RecruiterProfile>> {
    let record = state
        .store
        .get(Collection::Recruiters, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recruiter {}", id)))?;
    Ok(Stored::from_record(record)?)
}

/// GET /api/recruiters
pub async fn list_recruiters(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<RecruiterList>> {
    Ok(Json(recruiter_listing(&state, &query).await?))
}

/// POST /api/recruiters
pub async fn create_recruiter(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
    Json(signup): Json<RecruiterSignup>,
) -> ApiResult<(StatusCode, Json<RecruiterList>)> {
    user.require_unrestricted("create recruiters")?;
    let draft = signup.validate()?;

    let id = provision_recruiter(
        state.identity.as_ref(),
        state.store.as_ref(),
        draft,
        &signup.password,
    )
    .await
    .map_err(|e| e.into_api_error(Role::Recruiter))?;

    let listing = recruiter_listing(&state, &query).await?.with_created(id);
    Ok((StatusCode::CREATED, Json(listing)))
}

/// PUT /api/recruiters/:id
pub async fn update_recruiter(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
    Json(form): Json<RecruiterForm>,
) -> ApiResult<Json<RecruiterList>> {
    user.require_unrestricted("edit recruiters")?;
    let existing = load_recruiter(&state, &id).await?;
    let draft = form.validate()?;

    let profile = draft.into_profile(existing.data.uid, existing.data.status, existing.data.created_at);
    state
        .store
        .update(Collection::Recruiters, &id, to_document(&profile)?)
        .await?;
    info!(recruiter_id = %id, admin_id = %user.id, "Updated recruiter");

    Ok(Json(recruiter_listing(&state, &query).await?))
}

/// POST /api/recruiters/:id/toggle-status
pub async fn toggle_recruiter_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<RecruiterList>> {
    user.require_unrestricted("block or unblock recruiters")?;
    let existing = load_recruiter(&state, &id).await?;
    let status = existing.data.status.toggled();

    let mut changes = Document::new();
    changes.insert("status".to_string(), json!(status));
    state.store.update(Collection::Recruiters, &id, changes).await?;
    info!(recruiter_id = %id, status = status.as_str(), "Changed recruiter status");

    Ok(Json(recruiter_listing(&state, &query).await?))
}

/// DELETE /api/recruiters/:id
pub async fn delete_recruiter(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<RecruiterList>> {
    user.require_unrestricted("delete recruiters")?;
    load_recruiter(&state, &id).await?;
    state.store.delete(Collection::Recruiters, &id).await?;
    info!(recruiter_id = %id, admin_id = %user.id, "Deleted recruiter");

    Ok(Json(recruiter_listing(&state, &query).await?))
}
