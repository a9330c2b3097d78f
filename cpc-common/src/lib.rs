//! # CPC Common Library
//!
//! Shared code for the campus placement console services including:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Database bootstrap
//! - Department/branch code map
//! - Profile and message models
//! - Field validation rules
//! - Identity service and record store abstractions

pub mod config;
pub mod db;
pub mod departments;
pub mod error;
pub mod identity;
pub mod models;
pub mod store;
pub mod validation;

pub use error::{Error, Result};
