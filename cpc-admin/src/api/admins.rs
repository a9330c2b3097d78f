//! Admin management view and signup (unrestricted admins only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cpc_common::models::{AdminProfile, ProfileStatus, Role, Stored};
use cpc_common::store::{Collection, Document};
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::signup::{provision_admin, AdminSignup};
use crate::views::{apply_filters, decode_listing, ListQuery, ListResponse, StatusFilter};
use crate::AppState;

pub type AdminList = ListResponse<Stored<AdminProfile>>;

async fn admin_listing(state: &AppState, query: &ListQuery) -> ApiResult<AdminList> {
    let status = StatusFilter::<ProfileStatus>::parse(query.status.as_deref())?;
    let records = state.store.list_all(Collection::Admins).await?;
    let admins = decode_listing::<AdminProfile>(records);
    Ok(ListResponse::new(apply_filters(
        admins,
        query.search.as_deref(),
        status,
    )))
}

async fn load_admin_record(state: &AppState, id: &str) -> ApiResult<Stored<AdminProfile>> {
    let record = state
        .store
        .get(Collection::Admins, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Admin {}", id)))?;
    Ok(Stored::from_record(record)?)
}

/// GET /api/admins
pub async fn list_admins(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<AdminList>> {
    user.require_unrestricted("list admins")?;
    Ok(Json(admin_listing(&state, &query).await?))
}

/// POST /api/admins
pub async fn create_admin(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
    Json(signup): Json<AdminSignup>,
) -> ApiResult<(StatusCode, Json<AdminList>)> {
    user.require_unrestricted("create admins")?;
    let draft = signup.validate()?;

    let id = provision_admin(
        state.identity.as_ref(),
        state.store.as_ref(),
        draft,
        &signup.password,
    )
    .await
    .map_err(|e| e.into_api_error(Role::Admin))?;

    let listing = admin_listing(&state, &query).await?.with_created(id);
    Ok((StatusCode::CREATED, Json(listing)))
}

/// POST /api/admins/:id/toggle-status
pub async fn toggle_admin_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<AdminList>> {
    user.require_unrestricted("block or unblock admins")?;
    user.ensure_not_self(&id, "block")?;
    let existing = load_admin_record(&state, &id).await?;
    let status = existing.data.status.toggled();

    let mut changes = Document::new();
    changes.insert("status".to_string(), json!(status));
    state.store.update(Collection::Admins, &id, changes).await?;
    info!(admin_id = %id, by = %user.id, status = status.as_str(), "Changed admin status");

    Ok(Json(admin_listing(&state, &query).await?))
}

/// DELETE /api/admins/:id
pub async fn delete_admin(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<AdminList>> {
    user.require_unrestricted("delete admins")?;
    user.ensure_not_self(&id, "delete")?;
    load_admin_record(&state, &id).await?;
    state.store.delete(Collection::Admins, &id).await?;
    info!(admin_id = %id, by = %user.id, "Deleted admin");

    Ok(Json(admin_listing(&state, &query).await?))
}
