//! Identity service
//!
//! Issues email/password credentials and answers "is this email taken".
//! Profile records are keyed by the uid this service returns.

use async_trait::async_trait;
use chrono::Utc;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Role;

pub const PBKDF2_ITERATIONS: u32 = 10_000;
const HASH_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

/// Minimum password length accepted by the identity service itself
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("email already in use")]
    EmailInUse,

    #[error("invalid email")]
    InvalidEmail,

    #[error("weak password")]
    WeakPassword,

    #[error("identity service failure: {0}")]
    Unknown(String),
}

impl IdentityError {
    /// Message shown to the operator when account creation fails
    pub fn user_message(&self, role: Role) -> String {
        match self {
            IdentityError::EmailInUse => "Email is already in use".to_string(),
            IdentityError::InvalidEmail => "Invalid email address".to_string(),
            IdentityError::WeakPassword => "Password should be at least 6 characters".to_string(),
            IdentityError::Unknown(_) => format!("Failed to create {} account", role.as_str()),
        }
    }
}

impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return IdentityError::EmailInUse;
            }
        }
        IdentityError::Unknown(err.to_string())
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a credential; returns the new uid
    async fn issue_credential(&self, email: &str, password: &str) -> Result<String, IdentityError>;

    async fn check_email_registered(&self, email: &str) -> Result<bool, IdentityError>;

    /// uid of the matching credential, `None` on a bad email/password pair
    async fn verify_credential(&self, email: &str, password: &str) -> Result<Option<String>, IdentityError>;
}

/// Credentials stored in the local database (`credentials` table)
#[derive(Clone)]
pub struct SqliteIdentityProvider {
    pool: SqlitePool,
}

impl SqliteIdentityProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn hash_password(password: &str, salt: &[u8]) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    out
}

/// Constant-time check of a password against a stored hex digest
fn hash_matches(password: &str, salt: &[u8], stored_hex: &str) -> bool {
    let Some(stored) = from_hex(stored_hex) else {
        return false;
    };
    let candidate = hash_password(password, salt);
    candidate[..].ct_eq(&stored[..]).unwrap_u8() == 1
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

#[async_trait]
impl IdentityProvider for SqliteIdentityProvider {
    async fn issue_credential(&self, email: &str, password: &str) -> Result<String, IdentityError> {
        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(IdentityError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakPassword);
        }
        if self.check_email_registered(email).await? {
            return Err(IdentityError::EmailInUse);
        }

        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = to_hex(&hash_password(password, &salt));
        let uid = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO credentials (uid, email, password_hash, password_salt, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&uid)
        .bind(email)
        .bind(&hash)
        .bind(to_hex(&salt))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(uid = %uid, "Issued credential");
        Ok(uid)
    }

    async fn check_email_registered(&self, email: &str) -> Result<bool, IdentityError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM credentials WHERE email = ?")
            .bind(email.trim())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn verify_credential(&self, email: &str, password: &str) -> Result<Option<String>, IdentityError> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT uid, password_hash, password_salt FROM credentials WHERE email = ?",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some((uid, stored_hash, salt_hex)) = row else {
            return Ok(None);
        };

        let Some(salt) = from_hex(&salt_hex) else {
            warn!(uid = %uid, "Stored credential has a malformed salt");
            return Ok(None);
        };

        if hash_matches(password, &salt, &stored_hash) {
            Ok(Some(uid))
        } else {
            Ok(None)
        }
    }
}
