//! Student management view and single-entry signup

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use cpc_common::models::{to_document, ProfileStatus, Role, Stored, StudentProfile};
use cpc_common::store::{Collection, Document};
use cpc_common::validation::StudentForm;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::export::{students_csv, EXPORT_FILE_NAME};
use crate::session::CurrentUser;
use crate::signup::{provision_student, StudentSignup};
use crate::views::{apply_filters, decode_listing, ListQuery, ListResponse, StatusFilter};
use crate::AppState;

pub type StudentList = ListResponse<Stored<StudentProfile>>;

/// Fetch, scope and filter the student collection
pub(crate) async fn student_listing(
    state: &AppState,
    user: &CurrentUser,
    query: &ListQuery,
) -> ApiResult<StudentList> {
    let status = StatusFilter::<ProfileStatus>::parse(query.status.as_deref())?;

    // A2 admins are always pinned to their own branch
    let branch = match user.department_scope() {
        Some(scope) => Some(scope.to_string()),
        None => query
            .branch_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from),
    };

    let records = match &branch {
        Some(code) => {
            state
                .store
                .list_where(Collection::Students, "branchCode", code)
                .await?
        }
        None => state.store.list_all(Collection::Students).await?,
    };

    let students = decode_listing::<StudentProfile>(records);
    Ok(ListResponse::new(apply_filters(
        students,
        query.search.as_deref(),
        status,
    )))
}

async fn load_student(state: &AppState, user: &CurrentUser, id: &str) -> ApiResult<Stored<StudentProfile>> {
    let record = state
        .store
        .get(Collection::Students, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Student {}", id)))?;
    let student = Stored::<StudentProfile>::from_record(record)?;
    user.ensure_in_scope(Some(&student.data.branch_code))?;
    Ok(student)
}

/// GET /api/students
pub async fn list_students(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<StudentList>> {
    Ok(Json(student_listing(&state, &user, &query).await?))
}

/// POST /api/students
pub async fn create_student(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
    Json(signup): Json<StudentSignup>,
) -> ApiResult<(StatusCode, Json<StudentList>)> {
    let draft = signup.validate(Local::now().date_naive())?;
    user.ensure_in_scope(Some(&draft.branch_code))?;

    let id = provision_student(
        state.identity.as_ref(),
        state.store.as_ref(),
        draft,
        &signup.password,
    )
    .await
    .map_err(|e| e.into_api_error(Role::Student))?;

    let listing = student_listing(&state, &user, &query).await?.with_created(id);
    Ok((StatusCode::CREATED, Json(listing)))
}

/// PUT /api/students/:id
///
/// Replaces every editable field; identity, status and creation time stay.
pub async fn update_student(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
    Json(form): Json<StudentForm>,
) -> ApiResult<Json<StudentList>> {
    let existing = load_student(&state, &user, &id).await?;
    let draft = form.validate(Local::now().date_naive())?;
    user.ensure_in_scope(Some(&draft.branch_code))?;

    let profile = draft.into_profile(existing.data.uid, existing.data.status, existing.data.created_at);
    state
        .store
        .update(Collection::Students, &id, to_document(&profile)?)
        .await?;
    info!(student_id = %id, admin_id = %user.id, "Updated student");

    Ok(Json(student_listing(&state, &user, &query).await?))
}

/// POST /api/students/:id/toggle-status
pub async fn toggle_student_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<StudentList>> {
    let existing = load_student(&state, &user, &id).await?;
    let status = existing.data.status.toggled();

    let mut changes = Document::new();
    changes.insert("status".to_string(), json!(status));
    state.store.update(Collection::Students, &id, changes).await?;
    info!(student_id = %id, status = status.as_str(), "Changed student status");

    Ok(Json(student_listing(&state, &user, &query).await?))
}

/// DELETE /api/students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<StudentList>> {
    load_student(&state, &user, &id).await?;
    state.store.delete(Collection::Students, &id).await?;
    info!(student_id = %id, admin_id = %user.id, "Deleted student");

    Ok(Json(student_listing(&state, &user, &query).await?))
}

/// GET /api/students/export
pub async fn export_students(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let listing = student_listing(&state, &user, &query).await?;
    if listing.records.is_empty() {
        return Err(ApiError::BadRequest("No data to export".to_string()));
    }

    let body = students_csv(&listing.records);
    info!(rows = listing.total, "Exported students");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}
