//! Session context
//!
//! Login issues an opaque bearer token stored in the `sessions` table. Every
//! management handler takes a [`CurrentUser`] extracted from
//! `Authorization: Bearer <token>`; there is no other session state.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use cpc_common::db::session_timeout_seconds;
use cpc_common::models::{AdminProfile, AdminType, ProfileStatus, Role, Stored};
use cpc_common::store::Collection;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Authenticated admin for the current request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub role: Role,
    pub admin_type: AdminType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip)]
    pub token: String,
}

impl CurrentUser {
    pub fn from_admin(admin: &Stored<AdminProfile>, token: String) -> Self {
        let department_code = match admin.data.admin_type {
            AdminType::A1 => None,
            AdminType::A2 => Some(admin.data.dept_code.clone()),
        };
        Self {
            id: admin.id.clone(),
            role: Role::Admin,
            admin_type: admin.data.admin_type,
            department_code,
            token,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.admin_type == AdminType::A1
    }

    /// Department code every student/message access is confined to (A2 only)
    pub fn department_scope(&self) -> Option<&str> {
        match self.admin_type {
            AdminType::A1 => None,
            AdminType::A2 => Some(self.department_code.as_deref().unwrap_or("")),
        }
    }

    pub fn require_unrestricted(&self, action: &str) -> ApiResult<()> {
        if self.is_unrestricted() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("Not permitted to {}", action)))
        }
    }

    /// Reject access to a record outside the admin's department
    pub fn ensure_in_scope(&self, record_department: Option<&str>) -> ApiResult<()> {
        match self.department_scope() {
            None => Ok(()),
            Some(scope) if record_department == Some(scope) => Ok(()),
            Some(_) => Err(ApiError::Forbidden(
                "Record belongs to another department".to_string(),
            )),
        }
    }

    pub fn ensure_not_self(&self, admin_id: &str, action: &str) -> ApiResult<()> {
        if self.id == admin_id {
            Err(ApiError::Forbidden(format!("You cannot {} your own account", action)))
        } else {
            Ok(())
        }
    }
}

/// Persist a new session for `uid`; returns the token
pub async fn create_session(pool: &SqlitePool, uid: &str) -> ApiResult<String> {
    let token = Uuid::new_v4().to_string();
    let now = Utc::now();
    let timeout = session_timeout_seconds(pool).await?;
    let expires_at = now + Duration::seconds(timeout);

    sqlx::query("INSERT INTO sessions (token, uid, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(uid)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(pool)
        .await
        .map_err(cpc_common::Error::from)?;

    Ok(token)
}

/// uid owning a live session token
pub async fn session_owner(pool: &SqlitePool, token: &str) -> ApiResult<Option<String>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT uid, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await
            .map_err(cpc_common::Error::from)?;

    let Some((uid, expires_at)) = row else {
        return Ok(None);
    };

    let expired = chrono::DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t.with_timezone(&Utc) <= Utc::now())
        .unwrap_or(true);
    if expired {
        debug!("Session expired");
        delete_session(pool, token).await?;
        return Ok(None);
    }
    Ok(Some(uid))
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> ApiResult<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .map_err(cpc_common::Error::from)?;
    Ok(())
}

/// Load the admin profile behind `uid`, refusing blocked admins
pub async fn load_admin(state: &AppState, uid: &str) -> ApiResult<Stored<AdminProfile>> {
    let record = state
        .store
        .get(Collection::Admins, uid)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not an admin account".to_string()))?;
    let admin = Stored::<AdminProfile>::from_record(record)?;
    if admin.data.status == ProfileStatus::Blocked {
        return Err(ApiError::Forbidden("Account is blocked".to_string()));
    }
    Ok(admin)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?
            .to_string();

        let uid = session_owner(&state.db, &token)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".to_string()))?;

        // Blocking an admin ends their sessions on the next request
        let admin = load_admin(state, &uid).await?;
        Ok(CurrentUser::from_admin(&admin, token))
    }
}
