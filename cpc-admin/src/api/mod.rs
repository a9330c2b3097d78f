//! HTTP API handlers for cpc-admin

pub mod admins;
pub mod contact;
pub mod health;
pub mod import;
pub mod messages;
pub mod recruiters;
pub mod session;
pub mod students;

pub use admins::{create_admin, delete_admin, list_admins, toggle_admin_status};
pub use contact::submit_contact;
pub use health::health_routes;
pub use import::import_students;
pub use messages::{delete_message, expand_message, list_messages, mark_message_viewed};
pub use recruiters::{
    create_recruiter, delete_recruiter, list_recruiters, toggle_recruiter_status, update_recruiter,
};
pub use session::{current_session, login, logout};
pub use students::{
    create_student, delete_student, export_students, list_students, toggle_student_status, update_student,
};
