//! Login, current session, logout

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::session::{create_session, delete_session, load_admin, CurrentUser};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub current_user: CurrentUser,
}

/// POST /api/session
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let uid = state
        .identity
        .verify_credential(&request.email, &request.password)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| {
            warn!("Rejected login attempt");
            ApiError::Unauthorized("Invalid email or password".to_string())
        })?;

    let admin = load_admin(&state, &uid).await?;
    let token = create_session(&state.db, &uid).await?;
    let current_user = CurrentUser::from_admin(&admin, token.clone());

    info!(admin_id = %uid, admin_type = ?current_user.admin_type, "Admin logged in");

    Ok(Json(SessionResponse {
        token: Some(token),
        current_user,
    }))
}

/// GET /api/session
pub async fn current_session(user: CurrentUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        token: None,
        current_user: user,
    })
}

/// DELETE /api/session
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> ApiResult<StatusCode> {
    delete_session(&state.db, &user.token).await?;
    info!(admin_id = %user.id, "Admin logged out");
    Ok(StatusCode::NO_CONTENT)
}
