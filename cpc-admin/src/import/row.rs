//! Spreadsheet row conversion
//!
//! A [`RawImportRow`] is an all-string mapping from header name to cell
//! text. It is converted field by field into a typed [`StudentDraft`] before
//! any numeric or date logic runs.

use chrono::NaiveDate;
use cpc_common::validation::{StudentDraft, StudentForm};
use std::collections::BTreeMap;

/// Columns every import row must carry (non-blank after trimming)
pub const MANDATORY_FIELDS: [&str; 13] = [
    "firstName",
    "lastName",
    "gender",
    "registrationNo",
    "phone",
    "email",
    "dob",
    "tenthPercentage",
    "twelfthPercentage",
    "cgpa",
    "branch",
    "semester",
    "backlogs",
];

/// One parsed data row; absent cells read as the empty string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawImportRow {
    cells: BTreeMap<String, String>,
}

impl RawImportRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            cells: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> &str {
        self.cells.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }

    /// Mandatory fields that are absent or blank, in declaration order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        MANDATORY_FIELDS
            .iter()
            .copied()
            .filter(|field| self.get(field).trim().is_empty())
            .collect()
    }

    /// Typed student draft; `Err` holds a single human-readable reason
    pub fn to_draft(&self, today: NaiveDate) -> Result<StudentDraft, String> {
        let dob_text = self.get("dob").trim();
        let dob = parse_import_dob(dob_text)
            .ok_or_else(|| format!("invalid date of birth \"{}\", expected DD-MM-YYYY", dob_text))?;

        let form = StudentForm {
            first_name: self.get("firstName").to_string(),
            middle_name: self.get("middleName").to_string(),
            last_name: self.get("lastName").to_string(),
            gender: self.get("gender").to_string(),
            registration_no: self.get("registrationNo").to_string(),
            phone: self.get("phone").to_string(),
            email: self.get("email").to_string(),
            dob: dob.format("%Y-%m-%d").to_string(),
            tenth_percentage: self.get("tenthPercentage").to_string(),
            twelfth_percentage: self.get("twelfthPercentage").to_string(),
            cgpa: self.get("cgpa").to_string(),
            branch: self.get("branch").to_string(),
            semester: self.get("semester").to_string(),
            backlogs: self.get("backlogs").to_string(),
        };

        form.validate(today).map_err(|errors| match errors.first() {
            Some(e) => format!("{} → {}", e.field, e.message),
            None => "invalid row".to_string(),
        })
    }
}

/// Parse `DD-MM-YYYY` (day and month may omit the leading zero)
pub fn parse_import_dob(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().split('-');
    let day = parts.next()?.trim().parse::<u32>().ok()?;
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let year_text = parts.next()?.trim();
    if parts.next().is_some() || year_text.len() != 4 {
        return None;
    }
    let year = year_text.parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Initial password for an imported student: `DDMMYYYY`
pub fn derive_password(dob: NaiveDate) -> String {
    dob.format("%d%m%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn complete_row() -> RawImportRow {
        RawImportRow::from_pairs([
            ("firstName", " Ravi "),
            ("lastName", "Kumar"),
            ("gender", "Male"),
            ("registrationNo", "20017001"),
            ("phone", "9876543210"),
            ("email", "ravi@example.edu"),
            ("dob", "15-10-2002"),
            ("tenthPercentage", "85.5"),
            ("twelfthPercentage", "78"),
            ("cgpa", "8.2"),
            ("branch", "Information Technology"),
            ("semester", "5"),
            ("backlogs", "0"),
        ])
    }

    #[test]
    fn test_password_and_stored_date_from_dob() {
        let dob = parse_import_dob("15-10-2002").unwrap();
        assert_eq!(derive_password(dob), "15102002");
        assert_eq!(dob.format("%Y-%m-%d").to_string(), "2002-10-15");
    }

    #[test]
    fn test_single_digit_parts_are_zero_padded() {
        let dob = parse_import_dob("5-3-2003").unwrap();
        assert_eq!(derive_password(dob), "05032003");
    }

    #[test]
    fn test_impossible_dates_are_rejected() {
        assert!(parse_import_dob("31-02-2002").is_none());
        assert!(parse_import_dob("2002-10-15").is_none());
        assert!(parse_import_dob("15/10/2002").is_none());
        assert!(parse_import_dob("15-10-02").is_none());
        assert!(parse_import_dob("").is_none());
    }

    #[test]
    fn test_missing_fields_in_order() {
        let mut row = complete_row();
        assert!(row.missing_fields().is_empty());

        row.set("email", "   ");
        row.set("firstName", "");
        assert_eq!(row.missing_fields(), vec!["firstName", "email"]);
    }

    #[test]
    fn test_absent_cell_reads_empty() {
        let row = RawImportRow::new();
        assert_eq!(row.get("cgpa"), "");
        assert!(row.is_blank());
        assert_eq!(row.missing_fields().len(), MANDATORY_FIELDS.len());
    }

    #[test]
    fn test_to_draft_coerces_types() {
        let draft = complete_row().to_draft(today()).unwrap();
        assert_eq!(draft.first_name, "Ravi");
        assert_eq!(draft.branch_code, "IT");
        assert_eq!(draft.tenth_percentage, 85.5);
        assert_eq!(draft.backlogs, 0);
        assert_eq!(draft.semester, "5");
        assert_eq!(draft.dob, NaiveDate::from_ymd_opt(2002, 10, 15).unwrap());
    }

    #[test]
    fn test_to_draft_reports_first_rule() {
        let mut row = complete_row();
        row.set("cgpa", "12");
        let reason = row.to_draft(today()).unwrap_err();
        assert_eq!(reason, "cgpa → CGPA must be between 0 and 10");
    }
}
