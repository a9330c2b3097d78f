//! Bulk student import
//!
//! Validate-all-then-commit: every row is checked before the first account
//! is created. The commit phase is sequential and not atomic; rows committed
//! before a failing row stay committed and the failure reports how many.

pub mod row;
pub mod sheet;

use axum::http::StatusCode;
use chrono::NaiveDate;
use cpc_common::config::ImportConfig;
use cpc_common::departments;
use cpc_common::identity::IdentityProvider;
use cpc_common::store::RecordStore;
use cpc_common::validation::StudentDraft;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::signup::provision_student;
pub use row::{derive_password, parse_import_dob, RawImportRow, MANDATORY_FIELDS};
pub use sheet::{parse_rows, SheetFormat};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Unsupported file type \"{0}\". Upload a .csv, .xlsx, .xls or .ods file")]
    UnsupportedFormat(String),

    #[error("File exceeds the {limit} byte upload limit")]
    FileTooLarge { limit: usize },

    #[error("Failed to process the file. Please upload a valid file.")]
    Unreadable(String),

    #[error("File is empty or not recognized.")]
    Empty,

    #[error("Max {max} records allowed per upload.")]
    TooManyRows { max: usize },

    /// First violation found during validation; nothing was written
    #[error("Row {row}: {reason}")]
    Row { row: usize, reason: String },

    /// Commit stopped at `row`; earlier rows remain committed
    #[error("Failed to process the file. Please upload a valid file.")]
    Commit {
        committed: usize,
        row: usize,
        reason: String,
    },

    #[error("A bulk import is already running")]
    InProgress,

    /// Identity service failed while checking emails; the file is not at fault
    #[error("Operation failed. Please try again.")]
    Service(String),
}

impl ImportError {
    pub fn status(&self) -> StatusCode {
        match self {
            ImportError::InProgress => StatusCode::CONFLICT,
            ImportError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ImportError::Commit { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ImportError::Service(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ImportError::InProgress => "IMPORT_IN_PROGRESS",
            ImportError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ImportError::Row { .. } => "IMPORT_ROW_INVALID",
            ImportError::Commit { .. } => "IMPORT_COMMIT_FAILED",
            ImportError::Service(_) => "IDENTITY_SERVICE_ERROR",
            _ => "IMPORT_REJECTED",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            ImportError::Row { row, .. } => Some(json!({ "row": row })),
            ImportError::Commit {
                committed,
                row,
                reason,
            } => Some(json!({
                "committed": committed,
                "failedRow": row,
                "reason": reason,
            })),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
}

/// Spreadsheet row number of a data row (1-based, after the header)
pub fn sheet_row_number(index: usize) -> usize {
    index + 2
}

/// Runs one import against the identity service and record store
pub struct ImportProcessor<'a> {
    identity: &'a dyn IdentityProvider,
    store: &'a dyn RecordStore,
    config: &'a ImportConfig,
    today: NaiveDate,
    branch_scope: Option<&'a str>,
}

impl<'a> ImportProcessor<'a> {
    pub fn new(
        identity: &'a dyn IdentityProvider,
        store: &'a dyn RecordStore,
        config: &'a ImportConfig,
        today: NaiveDate,
    ) -> Self {
        Self {
            identity,
            store,
            config,
            today,
            branch_scope: None,
        }
    }

    /// Restrict accepted rows to one branch code
    pub fn with_branch_scope(mut self, branch_code: Option<&'a str>) -> Self {
        self.branch_scope = branch_code;
        self
    }

    pub async fn run(&self, file_name: &str, bytes: &[u8]) -> Result<ImportSummary, ImportError> {
        if bytes.len() > self.config.max_file_bytes {
            return Err(ImportError::FileTooLarge {
                limit: self.config.max_file_bytes,
            });
        }

        let rows = parse_rows(file_name, bytes).map_err(|e| {
            if let ImportError::Unreadable(reason) = &e {
                warn!(file = file_name, "Unreadable upload: {}", reason);
            }
            e
        })?;

        let drafts = self.validate(&rows).await?;
        self.commit(drafts).await
    }

    /// Check every row; the first violation aborts the whole import
    pub async fn validate(&self, rows: &[RawImportRow]) -> Result<Vec<StudentDraft>, ImportError> {
        if rows.is_empty() {
            return Err(ImportError::Empty);
        }
        if rows.len() > self.config.max_rows {
            return Err(ImportError::TooManyRows {
                max: self.config.max_rows,
            });
        }

        let mut seen_emails: HashSet<String> = HashSet::new();
        let mut drafts = Vec::with_capacity(rows.len());

        for (idx, raw) in rows.iter().enumerate() {
            let row = sheet_row_number(idx);

            let missing = raw.missing_fields();
            if !missing.is_empty() {
                return Err(ImportError::Row {
                    row,
                    reason: format!("missing fields → {}", missing.join(", ")),
                });
            }

            let branch = raw.get("branch").trim();
            let Some(code) = departments::code_for(branch) else {
                return Err(ImportError::Row {
                    row,
                    reason: format!("invalid branch \"{}\"", raw.get("branch")),
                });
            };

            if let Some(scope) = self.branch_scope {
                if code != scope {
                    return Err(ImportError::Row {
                        row,
                        reason: format!("branch \"{}\" is outside your department", branch),
                    });
                }
            }

            let draft = raw
                .to_draft(self.today)
                .map_err(|reason| ImportError::Row { row, reason })?;

            if !seen_emails.insert(draft.email.to_lowercase()) {
                return Err(ImportError::Row {
                    row,
                    reason: format!("duplicate email in file → {}", draft.email),
                });
            }

            if self.config.precheck_emails {
                let registered = self
                    .identity
                    .check_email_registered(&draft.email)
                    .await
                    .map_err(|e| {
                        error!(row, "Email pre-check failed: {}", e);
                        ImportError::Service(e.to_string())
                    })?;
                if registered {
                    return Err(ImportError::Row {
                        row,
                        reason: format!("Email already registered → {}", draft.email),
                    });
                }
            }

            drafts.push(draft);
        }

        Ok(drafts)
    }

    /// Provision rows strictly in order, stopping at the first failure
    pub async fn commit(&self, drafts: Vec<StudentDraft>) -> Result<ImportSummary, ImportError> {
        let total = drafts.len();

        for (idx, draft) in drafts.into_iter().enumerate() {
            let password = derive_password(draft.dob);
            if let Err(e) = provision_student(self.identity, self.store, draft, &password).await {
                error!(
                    row = sheet_row_number(idx),
                    committed = idx,
                    "Bulk import stopped: {}",
                    e
                );
                return Err(ImportError::Commit {
                    committed: idx,
                    row: sheet_row_number(idx),
                    reason: e.to_string(),
                });
            }
        }

        info!(imported = total, "Bulk upload completed");
        Ok(ImportSummary { imported: total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_numbers_skip_header() {
        assert_eq!(sheet_row_number(0), 2);
        assert_eq!(sheet_row_number(99), 101);
    }

    #[test]
    fn test_messages() {
        assert_eq!(ImportError::Empty.to_string(), "File is empty or not recognized.");
        assert_eq!(
            ImportError::TooManyRows { max: 100 }.to_string(),
            "Max 100 records allowed per upload."
        );
        assert_eq!(
            ImportError::Row {
                row: 4,
                reason: "missing fields → email".into()
            }
            .to_string(),
            "Row 4: missing fields → email"
        );
        let commit = ImportError::Commit {
            committed: 2,
            row: 4,
            reason: "email already in use".into(),
        };
        assert_eq!(
            commit.to_string(),
            "Failed to process the file. Please upload a valid file."
        );
        assert_eq!(commit.details().unwrap()["committed"], json!(2));
        assert_eq!(ImportError::InProgress.status(), StatusCode::CONFLICT);
        assert!(ImportError::Service("down".into()).status().is_server_error());
    }
}
