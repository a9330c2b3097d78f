//! cpc-admin library - campus placement admin console service
//!
//! Signup forms, record management views, bulk student import and CSV
//! export served over HTTP/JSON.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use cpc_common::config::ImportConfig;
use cpc_common::identity::{IdentityProvider, SqliteIdentityProvider};
use cpc_common::store::{RecordStore, SqliteRecordStore};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod export;
pub mod import;
pub mod session;
pub mod signup;
pub mod views;

// multipart framing on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (sessions)
    pub db: SqlitePool,
    pub store: Arc<dyn RecordStore>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Bulk import limits
    pub import: ImportConfig,
    /// Held for the duration of one bulk import
    pub import_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// State backed by the SQLite identity service and record store
    pub fn new(db: SqlitePool, import: ImportConfig) -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(db.clone()));
        let identity: Arc<dyn IdentityProvider> = Arc::new(SqliteIdentityProvider::new(db.clone()));
        Self::with_services(db, store, identity, import)
    }

    pub fn with_services(
        db: SqlitePool,
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        import: ImportConfig,
    ) -> Self {
        Self {
            db,
            store,
            identity,
            import,
            import_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build application router
///
/// Health, login and the public contact form need no session; everything
/// else extracts a `CurrentUser`.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let upload_limit = state.import.max_file_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    let public = Router::new()
        .merge(api::health_routes())
        .route("/api/contact", post(api::submit_contact));

    let session = Router::new().route(
        "/api/session",
        post(api::login).get(api::current_session).delete(api::logout),
    );

    let students = Router::new()
        .route("/api/students", get(api::list_students).post(api::create_student))
        .route("/api/students/export", get(api::export_students))
        .route(
            "/api/students/import",
            post(api::import_students).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/students/:id",
            put(api::update_student).delete(api::delete_student),
        )
        .route("/api/students/:id/toggle-status", post(api::toggle_student_status));

    let recruiters = Router::new()
        .route(
            "/api/recruiters",
            get(api::list_recruiters).post(api::create_recruiter),
        )
        .route(
            "/api/recruiters/:id",
            put(api::update_recruiter).delete(api::delete_recruiter),
        )
        .route("/api/recruiters/:id/toggle-status", post(api::toggle_recruiter_status));

    let admins = Router::new()
        .route("/api/admins", get(api::list_admins).post(api::create_admin))
        .route("/api/admins/:id", axum::routing::delete(api::delete_admin))
        .route("/api/admins/:id/toggle-status", post(api::toggle_admin_status));

    let messages = Router::new()
        .route("/api/messages", get(api::list_messages))
        .route("/api/messages/:id", axum::routing::delete(api::delete_message))
        .route("/api/messages/:id/expand", post(api::expand_message))
        .route("/api/messages/:id/mark-viewed", post(api::mark_message_viewed));

    Router::new()
        .merge(public)
        .merge(session)
        .merge(students)
        .merge(recruiters)
        .merge(admins)
        .merge(messages)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
