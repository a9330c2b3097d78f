//! Bulk student upload

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use cpc_common::models::{Stored, StudentProfile};
use serde::Serialize;
use tracing::{info, warn};

use super::students::student_listing;
use crate::error::ApiResult;
use crate::import::{ImportError, ImportProcessor};
use crate::session::CurrentUser;
use crate::views::{ListQuery, ListResponse};
use crate::AppState;

/// Multipart field carrying the spreadsheet
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub message: String,
    #[serde(flatten)]
    pub listing: ListResponse<Stored<StudentProfile>>,
}

fn multipart_error(err: MultipartError, limit: usize) -> ImportError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ImportError::FileTooLarge { limit }
    } else {
        ImportError::Unreadable(err.body_text())
    }
}

/// (file name, contents) of the `file` field
async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<(String, Vec<u8>), ImportError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(String::from).unwrap_or_default();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(ImportError::MissingFile)
}

/// POST /api/students/import
///
/// One import at a time; a second concurrent upload gets 409.
pub async fn import_students(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let Ok(_guard) = state.import_lock.try_lock() else {
        warn!(admin_id = %user.id, "Rejected upload: import already running");
        return Err(ImportError::InProgress.into());
    };

    let (file_name, bytes) = read_upload(&mut multipart, state.import.max_file_bytes).await?;
    info!(
        admin_id = %user.id,
        file = %file_name,
        bytes = bytes.len(),
        "Starting bulk import"
    );

    let summary = ImportProcessor::new(
        state.identity.as_ref(),
        state.store.as_ref(),
        &state.import,
        Local::now().date_naive(),
    )
    .with_branch_scope(user.department_scope())
    .run(&file_name, &bytes)
    .await?;

    let listing = student_listing(&state, &user, &query).await?;
    Ok(Json(ImportResponse {
        imported: summary.imported,
        message: "Bulk upload completed!".to_string(),
        listing,
    }))
}
