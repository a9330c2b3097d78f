//! Local identity service

use cpc_common::db::init_database;
use cpc_common::identity::{IdentityError, IdentityProvider, SqliteIdentityProvider};
use tempfile::TempDir;

async fn setup() -> (TempDir, SqliteIdentityProvider) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("cpc.db")).await.unwrap();
    (dir, SqliteIdentityProvider::new(pool))
}

#[tokio::test]
async fn test_issue_then_verify() {
    let (_dir, identity) = setup().await;

    let uid = identity
        .issue_credential("ravi@example.edu", "15102002")
        .await
        .unwrap();
    assert!(!uid.is_empty());

    assert_eq!(
        identity.verify_credential("ravi@example.edu", "15102002").await.unwrap(),
        Some(uid)
    );
    assert_eq!(
        identity.verify_credential("ravi@example.edu", "wrong-pass").await.unwrap(),
        None
    );
    assert_eq!(
        identity.verify_credential("nobody@example.edu", "15102002").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_duplicate_email_is_case_insensitive() {
    let (_dir, identity) = setup().await;

    identity
        .issue_credential("Ravi@Example.edu", "Passw0rd!")
        .await
        .unwrap();

    assert!(identity.check_email_registered("ravi@example.edu").await.unwrap());
    let err = identity
        .issue_credential("ravi@example.edu", "Passw0rd!")
        .await
        .unwrap_err();
    assert_eq!(err, IdentityError::EmailInUse);
}

#[tokio::test]
async fn test_rejects_weak_password_and_bad_email() {
    let (_dir, identity) = setup().await;

    assert_eq!(
        identity.issue_credential("ravi@example.edu", "12345").await.unwrap_err(),
        IdentityError::WeakPassword
    );
    assert_eq!(
        identity.issue_credential("not-an-email", "Passw0rd!").await.unwrap_err(),
        IdentityError::InvalidEmail
    );
    assert!(!identity.check_email_registered("ravi@example.edu").await.unwrap());
}

#[tokio::test]
async fn test_uids_are_distinct() {
    let (_dir, identity) = setup().await;

    let a = identity.issue_credential("a@example.edu", "secret1").await.unwrap();
    let b = identity.issue_credential("b@example.edu", "secret1").await.unwrap();
    assert_ne!(a, b);
}
