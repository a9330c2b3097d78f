//! Profile and message records
//!
//! Typed views of the documents held in the record store. Field names are
//! camelCase on the wire and in storage so that records written by other
//! console clients stay readable.

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, Record};
use crate::{Error, Result};

/// Account status shared by student, recruiter and admin profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    #[default]
    Active,
    Blocked,
}

impl ProfileStatus {
    /// `active` <-> `blocked`
    pub fn toggled(self) -> Self {
        match self {
            ProfileStatus::Active => ProfileStatus::Blocked,
            ProfileStatus::Blocked => ProfileStatus::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Blocked => "blocked",
        }
    }
}

/// Contact message status; only ever moves `new` -> `viewed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    New,
    Viewed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Recruiter,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Recruiter => "recruiter",
            Role::Admin => "admin",
        }
    }
}

/// Admin privilege tier
///
/// `A1` is unrestricted; `A2` is limited to its own department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminType {
    A1,
    A2,
}

impl AdminType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "A1" => Some(AdminType::A1),
            "A2" => Some(AdminType::A2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub uid: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    pub gender: String,
    pub registration_no: String,
    pub phone: String,
    pub email: String,
    /// `YYYY-MM-DD`
    pub dob: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub tenth_percentage: f64,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub twelfth_percentage: f64,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub cgpa: f64,
    pub branch: String,
    pub branch_code: String,
    pub semester: String,
    #[serde(deserialize_with = "backlog_count")]
    pub backlogs: u32,
    pub role: Role,
    #[serde(default)]
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruiterProfile {
    pub uid: String,
    pub company_name: String,
    pub email: String,
    pub company_info: String,
    pub role: Role,
    #[serde(default)]
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub uid: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub username: String,
    #[serde(rename = "type")]
    pub admin_type: AdminType,
    pub department: String,
    pub dept_code: String,
    pub role: Role,
    #[serde(default)]
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
}

/// Contact-form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub user_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(default)]
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// A typed record together with its store id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T: DeserializeOwned> Stored<T> {
    pub fn from_record(record: Record) -> Result<Self> {
        let data = serde_json::from_value(Value::Object(record.fields))?;
        Ok(Self {
            id: record.id,
            data,
        })
    }
}

/// Serialize a typed model into a store document
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Internal(format!(
            "expected a JSON object for a document, got {}",
            other
        ))),
    }
}

// Older console clients stored numeric fields as strings.
fn number_or_numeric_string<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("not a number: {:?}", s))),
        other => Err(de::Error::custom(format!("expected number, got {}", other))),
    }
}

fn backlog_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| de::Error::custom("backlogs must be a non-negative integer")),
        Value::String(s) => crate::validation::parse_backlogs(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid backlogs: {:?}", s))),
        other => Err(de::Error::custom(format!("expected backlogs, got {}", other))),
    }
}
