//! Shared helpers for cpc-admin integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use cpc_admin::bootstrap::ensure_bootstrap_admin;
use cpc_admin::{build_router, AppState};
use cpc_common::config::{BootstrapAdminConfig, ImportConfig};
use cpc_common::db::init_database;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

pub const ROOT_EMAIL: &str = "root@example.edu";
pub const ROOT_PASSWORD: &str = "rootpass1";
pub const CS: &str = "Computer Science & Engineering";
pub const IT: &str = "Information Technology";

const BOUNDARY: &str = "cpc-test-boundary";

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/api/session",
                None,
                Some(json!({"email": email, "password": password})),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn root_token(&self) -> String {
        self.login(ROOT_EMAIL, ROOT_PASSWORD).await
    }

    /// Create an A2 admin for `department` and log in as them
    pub async fn department_admin(&self, root: &str, username: &str, department: &str) -> String {
        let email = format!("{username}@example.edu");
        let (status, body) = self
            .send(json_request(
                "POST",
                "/api/admins",
                Some(root),
                Some(json!({
                    "firstName": "Dept",
                    "lastName": "Admin",
                    "email": email,
                    "phone": "9876543210",
                    "username": username,
                    "type": "A2",
                    "department": department,
                    "password": "deptpass1",
                    "confirmPassword": "deptpass1",
                })),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "admin create failed: {body}");
        self.login(&email, "deptpass1").await
    }

    pub async fn create_student(&self, token: &str, email: &str, branch: &str) -> String {
        let (status, body) = self
            .send(json_request("POST", "/api/students", Some(token), Some(student_json(email, branch))))
            .await;
        assert_eq!(status, StatusCode::CREATED, "student create failed: {body}");
        body["created"].as_str().unwrap().to_string()
    }
}

pub fn bootstrap_config() -> BootstrapAdminConfig {
    BootstrapAdminConfig {
        email: ROOT_EMAIL.to_string(),
        password: ROOT_PASSWORD.to_string(),
        username: "root".to_string(),
        first_name: "Root".to_string(),
        last_name: "Admin".to_string(),
        department: IT.to_string(),
        phone: Some("9876543210".to_string()),
    }
}

pub async fn setup_with(import: ImportConfig) -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("cpc.db")).await.unwrap();
    let state = AppState::new(pool, import);
    ensure_bootstrap_admin(&state, Some(&bootstrap_config()))
        .await
        .unwrap()
        .expect("bootstrap admin should be created");
    let router = build_router(state.clone());
    TestApp { dir, state, router }
}

pub async fn setup() -> TestApp {
    setup_with(ImportConfig::default()).await
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn upload_request(token: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/students/import")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn student_json(email: &str, branch: &str) -> Value {
    json!({
        "firstName": "Ravi",
        "lastName": "Kumar",
        "gender": "Male",
        "registrationNo": "20017001",
        "phone": "9876543210",
        "email": email,
        "dob": "2002-10-15",
        "tenthPercentage": "85.5",
        "twelfthPercentage": "78",
        "cgpa": "8.2",
        "branch": branch,
        "semester": "5",
        "backlogs": "No Backlog",
        "password": "Passw0rd!",
        "confirmPassword": "Passw0rd!",
    })
}

pub const CSV_HEADER: &str =
    "firstName,lastName,gender,registrationNo,phone,email,dob,tenthPercentage,twelfthPercentage,cgpa,branch,semester,backlogs";

/// One valid CSV data line
pub fn csv_row(n: usize, email: &str, branch: &str) -> String {
    format!(
        "Student{n},Kumar,Female,2001{n:04},98765432{n:02},{email},15-10-2002,85,78.5,8.2,{branch},5,No Backlog"
    )
}

pub fn csv_file(rows: &[String]) -> Vec<u8> {
    let mut text = String::from(CSV_HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text.into_bytes()
}
