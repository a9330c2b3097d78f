//! Public contact form

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use cpc_common::departments;
use cpc_common::models::{to_document, ContactMessage, MessageStatus};
use cpc_common::store::Collection;
use cpc_common::validation::{self, FieldError, ValidationErrors};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub user_type: String,
    pub message: String,
    pub department_code: Option<String>,
}

impl ContactForm {
    fn validate(&self) -> Result<ContactMessage, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if let Err(message) = validation::email(&self.email) {
            errors.push(FieldError::new("email", message));
        }
        if self.message.trim().is_empty() {
            errors.push(FieldError::new("message", "Message is required"));
        }
        let department_code = self
            .department_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if let Some(code) = department_code {
            if !departments::is_known_code(code) {
                errors.push(FieldError::new("departmentCode", "Unknown department"));
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ContactMessage {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            user_type: self.user_type.trim().to_string(),
            message: self.message.trim().to_string(),
            department_code: department_code.map(String::from),
            status: MessageStatus::New,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: String,
}

/// POST /api/contact (no session required)
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    let message = form.validate()?;
    let id = state
        .store
        .insert(Collection::ContactSubmissions, to_document(&message)?)
        .await?;

    info!(message_id = %id, "Contact message received");
    Ok((StatusCode::CREATED, Json(ContactResponse { id })))
}
