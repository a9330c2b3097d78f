//! Record management list shaping
//!
//! Listings are fetched whole (optionally narrowed by one equality predicate
//! in the store), then filtered here by a case-insensitive substring search
//! OR-ed across a few fields and AND-ed with an exact status match.

use cpc_common::models::{
    AdminProfile, ContactMessage, MessageStatus, ProfileStatus, RecruiterProfile, Stored, StudentProfile,
};
use cpc_common::store::Record;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ApiError, ApiResult};

/// Query string accepted by every listing and mutation endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub branch_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<S> {
    All,
    Only(S),
}

impl<S: DeserializeOwned + PartialEq + Copy> StatusFilter<S> {
    /// `None`, empty or `all` match everything; anything else must be a status value
    pub fn parse(raw: Option<&str>) -> ApiResult<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Ok(StatusFilter::All),
            Some(value) => serde_json::from_value(Value::String(value.to_string()))
                .map(StatusFilter::Only)
                .map_err(|_| ApiError::BadRequest(format!("Unknown status filter \"{}\"", value))),
        }
    }

    pub fn matches(&self, status: S) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

/// A record shape that can appear in a management list
pub trait Listable {
    type Status: DeserializeOwned + PartialEq + Copy;

    fn status(&self) -> Self::Status;

    /// Fields the search term is matched against
    fn search_fields(&self) -> Vec<&str>;
}

impl Listable for StudentProfile {
    type Status = ProfileStatus;

    fn status(&self) -> ProfileStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.first_name.as_str(), self.last_name.as_str(), self.email.as_str()]
    }
}

impl Listable for RecruiterProfile {
    type Status = ProfileStatus;

    fn status(&self) -> ProfileStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.company_name.as_str(), self.email.as_str()]
    }
}

impl Listable for AdminProfile {
    type Status = ProfileStatus;

    fn status(&self) -> ProfileStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.email.as_str()]
    }
}

impl Listable for ContactMessage {
    type Status = MessageStatus;

    fn status(&self) -> MessageStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.message.as_str()]
    }
}

/// Case-insensitive substring match against any field; blank terms match all
pub fn matches_search(fields: &[&str], term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&term))
}

/// Decode a listing, skipping (and logging) records that do not fit the model
pub fn decode_listing<T: DeserializeOwned>(records: Vec<Record>) -> Vec<Stored<T>> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            match Stored::<T>::from_record(record) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    warn!(record_id = %id, "Skipping malformed record: {}", e);
                    None
                }
            }
        })
        .collect()
}

pub fn apply_filters<T: Listable>(
    records: Vec<Stored<T>>,
    search: Option<&str>,
    status: StatusFilter<T::Status>,
) -> Vec<Stored<T>> {
    let term = search.unwrap_or("");
    records
        .into_iter()
        .filter(|r| status.matches(r.data.status()) && matches_search(&r.data.search_fields(), term))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T> {
    pub records: Vec<T>,
    pub total: usize,
    /// Id of the record a create call just wrote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

impl<T> ListResponse<T> {
    pub fn new(records: Vec<T>) -> Self {
        let total = records.len();
        Self {
            records,
            total,
            created: None,
        }
    }

    pub fn with_created(mut self, id: String) -> Self {
        self.created = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(name: &str, body: &str, status: MessageStatus) -> Stored<ContactMessage> {
        Stored {
            id: name.to_lowercase(),
            data: ContactMessage {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                phone: String::new(),
                user_type: "student".into(),
                message: body.into(),
                department_code: None,
                status,
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_search_is_case_insensitive_or() {
        assert!(matches_search(&["Ravi", "Kumar", "ravi@x.edu"], "KUM"));
        assert!(matches_search(&["Ravi", "Kumar", "ravi@x.edu"], "x.edu"));
        assert!(!matches_search(&["Ravi", "Kumar"], "asha"));
        assert!(matches_search(&["Ravi"], "  "));
    }

    #[test]
    fn test_status_filter_parsing() {
        assert_eq!(StatusFilter::<ProfileStatus>::parse(None).unwrap(), StatusFilter::All);
        assert_eq!(StatusFilter::<ProfileStatus>::parse(Some("all")).unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::<ProfileStatus>::parse(Some("blocked")).unwrap(),
            StatusFilter::Only(ProfileStatus::Blocked)
        );
        assert_eq!(
            StatusFilter::<MessageStatus>::parse(Some("viewed")).unwrap(),
            StatusFilter::Only(MessageStatus::Viewed)
        );
        assert!(StatusFilter::<MessageStatus>::parse(Some("blocked")).is_err());
    }

    #[test]
    fn test_search_and_status_combine_with_and() {
        let records = vec![
            message("Meera", "placement query", MessageStatus::New),
            message("Arjun", "placement drive dates", MessageStatus::Viewed),
            message("Kiran", "hostel", MessageStatus::New),
        ];

        let hits = apply_filters(records.clone(), Some("placement"), StatusFilter::All);
        assert_eq!(hits.len(), 2);

        let hits = apply_filters(records.clone(), Some("placement"), StatusFilter::Only(MessageStatus::New));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].data.name, "Meera");

        let hits = apply_filters(records, None, StatusFilter::Only(MessageStatus::New));
        assert_eq!(hits.len(), 2);
    }
}
