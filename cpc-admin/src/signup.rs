//! Signup forms: validate, issue a credential, write the profile
//!
//! The profile record is keyed by the identity id the credential service
//! returns. Bulk import reuses [`provision_student`] for each committed row.

use chrono::{NaiveDate, Utc};
use cpc_common::identity::{IdentityError, IdentityProvider};
use cpc_common::models::{to_document, ProfileStatus, Role};
use cpc_common::store::{Collection, RecordStore};
use cpc_common::validation::{
    self, AdminDraft, AdminForm, FieldError, RecruiterDraft, RecruiterForm, StudentDraft, StudentForm,
    ValidationErrors,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{0}")]
    Identity(#[from] IdentityError),

    #[error("{0}")]
    Store(#[from] cpc_common::Error),
}

impl ProvisionError {
    pub fn into_api_error(self, role: Role) -> ApiError {
        match self {
            ProvisionError::Identity(e) => ApiError::identity(role, e),
            ProvisionError::Store(e) => ApiError::Common(e),
        }
    }
}

pub async fn provision_student(
    identity: &dyn IdentityProvider,
    store: &dyn RecordStore,
    draft: StudentDraft,
    password: &str,
) -> Result<String, ProvisionError> {
    let uid = identity.issue_credential(&draft.email, password).await?;
    let profile = draft.into_profile(uid.clone(), ProfileStatus::Active, Utc::now());
    store
        .insert_with_id(Collection::Students, &uid, to_document(&profile)?)
        .await?;
    info!(student_id = %uid, branch_code = %profile.branch_code, "Created student profile");
    Ok(uid)
}

pub async fn provision_recruiter(
    identity: &dyn IdentityProvider,
    store: &dyn RecordStore,
    draft: RecruiterDraft,
    password: &str,
) -> Result<String, ProvisionError> {
    let uid = identity.issue_credential(&draft.email, password).await?;
    let profile = draft.into_profile(uid.clone(), ProfileStatus::Active, Utc::now());
    store
        .insert_with_id(Collection::Recruiters, &uid, to_document(&profile)?)
        .await?;
    info!(recruiter_id = %uid, "Created recruiter profile");
    Ok(uid)
}

pub async fn provision_admin(
    identity: &dyn IdentityProvider,
    store: &dyn RecordStore,
    draft: AdminDraft,
    password: &str,
) -> Result<String, ProvisionError> {
    let uid = identity.issue_credential(&draft.email, password).await?;
    let profile = draft.into_profile(uid.clone(), Utc::now());
    store
        .insert_with_id(Collection::Admins, &uid, to_document(&profile)?)
        .await?;
    info!(admin_id = %uid, admin_type = ?profile.admin_type, dept_code = %profile.dept_code, "Created admin profile");
    Ok(uid)
}

fn require_confirmation(errors: &mut ValidationErrors, confirmation: &str) {
    if confirmation.is_empty() {
        errors.push(FieldError::new("confirmPassword", "Please confirm your password"));
    }
}

fn strong_password(errors: &mut ValidationErrors, password: &str) {
    if let Err(message) = validation::password(password) {
        errors.push(FieldError::new("password", message));
    }
}

/// Schema errors first; confirmation equality only once the schema passes
fn finish<T>(
    draft: Result<T, ValidationErrors>,
    mut extra: ValidationErrors,
    password: &str,
    confirmation: &str,
) -> Result<T, ValidationErrors> {
    let draft = match draft {
        Ok(d) if extra.is_empty() => d,
        Ok(_) => return Err(extra),
        Err(mut errors) => {
            errors.errors.append(&mut extra.errors);
            return Err(errors);
        }
    };
    validation::confirm_password(password, confirmation)?;
    Ok(draft)
}

/// Single-entry student form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSignup {
    #[serde(flatten)]
    pub form: StudentForm,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl StudentSignup {
    pub fn validate(&self, today: NaiveDate) -> Result<StudentDraft, ValidationErrors> {
        let mut extra = ValidationErrors::default();
        strong_password(&mut extra, &self.password);
        require_confirmation(&mut extra, &self.confirm_password);
        finish(self.form.validate(today), extra, &self.password, &self.confirm_password)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruiterSignup {
    #[serde(flatten)]
    pub form: RecruiterForm,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RecruiterSignup {
    pub fn validate(&self) -> Result<RecruiterDraft, ValidationErrors> {
        let mut extra = ValidationErrors::default();
        strong_password(&mut extra, &self.password);
        require_confirmation(&mut extra, &self.confirm_password);
        finish(self.form.validate(), extra, &self.password, &self.confirm_password)
    }
}

/// Admin form; password strength is left to the identity service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSignup {
    #[serde(flatten)]
    pub form: AdminForm,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl AdminSignup {
    pub fn validate(&self) -> Result<AdminDraft, ValidationErrors> {
        let mut extra = ValidationErrors::default();
        if self.password.is_empty() {
            extra.push(FieldError::new("password", "Password is required"));
        }
        require_confirmation(&mut extra, &self.confirm_password);
        finish(self.form.validate(), extra, &self.password, &self.confirm_password)
    }
}
