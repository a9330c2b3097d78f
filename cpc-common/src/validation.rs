//! Field and cross-field validation rules
//!
//! The same rules back the single-entry signup forms, the record edit
//! endpoints and the bulk import row conversion. Every violated rule yields a
//! field-scoped message; a form is accepted only when no rule fails.

use chrono::{DateTime, Months, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::departments;
use crate::models::{AdminProfile, AdminType, ProfileStatus, RecruiterProfile, Role, StudentProfile};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

// lowercase letters, then optional trailing digits only
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z]*[0-9]*$").expect("valid username pattern"));

pub const GENDERS: [&str; 4] = ["Male", "Female", "Prefer not to say", "Other"];

pub const MINIMUM_STUDENT_AGE_YEARS: u32 = 16;

/// Single violated rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All rule violations of one form, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    fn check<T>(&mut self, field: &str, outcome: Result<T, String>) -> Option<T> {
        match outcome {
            Ok(v) => Some(v),
            Err(message) => {
                self.errors.push(FieldError::new(field, message));
                None
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

// ============================================================================
// Individual rules
// ============================================================================

/// Non-blank, at least two characters after trimming
pub fn person_name(value: &str, message: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.chars().count() < 2 {
        return Err(message.to_string());
    }
    Ok(trimmed.to_string())
}

pub fn required(value: &str, message: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(message.to_string());
    }
    Ok(trimmed.to_string())
}

pub fn email(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if !EMAIL_RE.is_match(trimmed) {
        return Err("Invalid email address".to_string());
    }
    Ok(trimmed.to_string())
}

/// 10-15 characters; digits are not enforced
pub fn phone(value: &str, too_short: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < 10 {
        return Err(too_short.to_string());
    }
    if len > 15 {
        return Err("Phone number must be at most 15 characters".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn password(value: &str) -> Result<(), String> {
    if value.chars().count() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    Ok(())
}

/// Confirmation equality, checked at submit time outside the form schema
pub fn confirm_password(password: &str, confirmation: &str) -> Result<(), FieldError> {
    if password != confirmation {
        return Err(FieldError::new("confirmPassword", "Passwords don't match"));
    }
    Ok(())
}

pub fn username(value: &str) -> Result<String, String> {
    let len = value.chars().count();
    if len < 3 {
        return Err("Username must be at least 3 characters".to_string());
    }
    if len > 20 {
        return Err("Username must be at most 20 characters".to_string());
    }
    if !USERNAME_RE.is_match(value) {
        return Err(
            "Username must start with a lowercase letter, contain only lowercase letters, and may end with numbers"
                .to_string(),
        );
    }
    Ok(value.to_string())
}

fn bounded_number(value: &str, min: f64, max: f64, message: &str) -> Result<f64, String> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= min && n <= max => Ok(n),
        _ => Err(message.to_string()),
    }
}

pub fn percentage(value: &str) -> Result<f64, String> {
    bounded_number(value, 0.0, 100.0, "Percentage must be between 0 and 100")
}

pub fn cgpa(value: &str) -> Result<f64, String> {
    bounded_number(value, 0.0, 10.0, "CGPA must be between 0 and 10")
}

/// `YYYY-MM-DD`, at least sixteen years before `today`
pub fn date_of_birth(value: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let dob = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| "Invalid date of birth".to_string())?;
    let latest_allowed = today
        .checked_sub_months(Months::new(MINIMUM_STUDENT_AGE_YEARS * 12))
        .ok_or_else(|| "Invalid date of birth".to_string())?;
    if dob > latest_allowed {
        return Err("You must be at least 16 years old".to_string());
    }
    Ok(dob)
}

/// Department name -> (name, derived code)
pub fn department(value: &str, required_message: &str) -> Result<(String, String), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(required_message.to_string());
    }
    let code = departments::code_for(trimmed).ok_or_else(|| format!("Unknown department \"{}\"", trimmed))?;
    Ok((trimmed.to_string(), code.to_string()))
}

pub fn gender(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Gender is required".to_string());
    }
    if !GENDERS.contains(&trimmed) {
        return Err(format!("Gender must be one of: {}", GENDERS.join(", ")));
    }
    Ok(trimmed.to_string())
}

pub fn semester(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Semester is required".to_string());
    }
    match trimmed.parse::<u8>() {
        Ok(1..=8) => Ok(trimmed.to_string()),
        _ => Err("Semester must be between 1 and 8".to_string()),
    }
}

/// "No Backlog" or an integer count (0-8)
pub fn parse_backlogs(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("no backlog") {
        return Some(0);
    }
    match trimmed.parse::<u32>() {
        Ok(n) if n <= 8 => Some(n),
        _ => None,
    }
}

pub fn backlogs(value: &str) -> Result<u32, String> {
    if value.trim().is_empty() {
        return Err("Backlogs information is required".to_string());
    }
    parse_backlogs(value).ok_or_else(|| "Backlogs must be \"No Backlog\" or a number from 0 to 8".to_string())
}

pub fn registration_no(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Registration number is required".to_string());
    }
    if trimmed.chars().count() != 8 {
        return Err("Registration number must be exactly 8 characters".to_string());
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Student
// ============================================================================

/// Student form as submitted (all strings, like the browser form)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentForm {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub gender: String,
    pub registration_no: String,
    pub phone: String,
    pub email: String,
    /// `YYYY-MM-DD`
    pub dob: String,
    pub tenth_percentage: String,
    pub twelfth_percentage: String,
    pub cgpa: String,
    pub branch: String,
    pub semester: String,
    pub backlogs: String,
}

/// Student form after every rule passed; numeric fields coerced
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDraft {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub gender: String,
    pub registration_no: String,
    pub phone: String,
    pub email: String,
    pub dob: NaiveDate,
    pub tenth_percentage: f64,
    pub twelfth_percentage: f64,
    pub cgpa: f64,
    pub branch: String,
    pub branch_code: String,
    pub semester: String,
    pub backlogs: u32,
}

impl StudentForm {
    pub fn validate(&self, today: NaiveDate) -> Result<StudentDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let first_name = errors.check("firstName", person_name(&self.first_name, "First name is required"));
        let last_name = errors.check("lastName", person_name(&self.last_name, "Last name is required"));
        let gender = errors.check("gender", gender(&self.gender));
        let registration_no = errors.check("registrationNo", registration_no(&self.registration_no));
        let phone = errors.check("phone", phone(&self.phone, "Valid phone number is required"));
        let email = errors.check("email", email(&self.email));
        let dob = errors.check("dob", date_of_birth(&self.dob, today));
        let tenth = errors.check("tenthPercentage", percentage(&self.tenth_percentage));
        let twelfth = errors.check("twelfthPercentage", percentage(&self.twelfth_percentage));
        let cgpa = errors.check("cgpa", cgpa(&self.cgpa));
        let branch = errors.check("branch", department(&self.branch, "Branch is required"));
        let semester = errors.check("semester", semester(&self.semester));
        let backlogs = errors.check("backlogs", backlogs(&self.backlogs));

        match (
            first_name, last_name, gender, registration_no, phone, email, dob, tenth, twelfth, cgpa,
            branch, semester, backlogs,
        ) {
            (
                Some(first_name),
                Some(last_name),
                Some(gender),
                Some(registration_no),
                Some(phone),
                Some(email),
                Some(dob),
                Some(tenth_percentage),
                Some(twelfth_percentage),
                Some(cgpa),
                Some((branch, branch_code)),
                Some(semester),
                Some(backlogs),
            ) if errors.is_empty() => Ok(StudentDraft {
                first_name,
                middle_name: self.middle_name.trim().to_string(),
                last_name,
                gender,
                registration_no,
                phone,
                email,
                dob,
                tenth_percentage,
                twelfth_percentage,
                cgpa,
                branch,
                branch_code,
                semester,
                backlogs,
            }),
            _ => Err(errors),
        }
    }
}

impl StudentDraft {
    pub fn into_profile(self, uid: String, status: ProfileStatus, created_at: DateTime<Utc>) -> StudentProfile {
        StudentProfile {
            uid,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            gender: self.gender,
            registration_no: self.registration_no,
            phone: self.phone,
            email: self.email,
            dob: self.dob.format("%Y-%m-%d").to_string(),
            tenth_percentage: self.tenth_percentage,
            twelfth_percentage: self.twelfth_percentage,
            cgpa: self.cgpa,
            branch: self.branch,
            branch_code: self.branch_code,
            semester: self.semester,
            backlogs: self.backlogs,
            role: Role::Student,
            status,
            created_at,
        }
    }
}

// ============================================================================
// Recruiter
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecruiterForm {
    pub company_name: String,
    pub email: String,
    pub company_info: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecruiterDraft {
    pub company_name: String,
    pub email: String,
    pub company_info: String,
}

impl RecruiterForm {
    pub fn validate(&self) -> Result<RecruiterDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let company_name = errors.check(
            "companyName",
            person_name(&self.company_name, "Company name is required"),
        );
        let email = errors.check("email", email(&self.email));
        let company_info = errors.check("companyInfo", {
            let trimmed = self.company_info.trim();
            if trimmed.chars().count() < 30 {
                Err("Company information must be at least 30 characters".to_string())
            } else {
                Ok(trimmed.to_string())
            }
        });

        match (company_name, email, company_info) {
            (Some(company_name), Some(email), Some(company_info)) if errors.is_empty() => {
                Ok(RecruiterDraft {
                    company_name,
                    email,
                    company_info,
                })
            }
            _ => Err(errors),
        }
    }
}

impl RecruiterDraft {
    pub fn into_profile(self, uid: String, status: ProfileStatus, created_at: DateTime<Utc>) -> RecruiterProfile {
        RecruiterProfile {
            uid,
            company_name: self.company_name,
            email: self.email,
            company_info: self.company_info,
            role: Role::Recruiter,
            status,
            created_at,
        }
    }
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminForm {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub username: String,
    #[serde(rename = "type")]
    pub admin_type: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminDraft {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub username: String,
    pub admin_type: AdminType,
    pub department: String,
    pub dept_code: String,
}

impl AdminForm {
    pub fn validate(&self) -> Result<AdminDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let first_name = errors.check("firstName", person_name(&self.first_name, "First name is required"));
        let last_name = errors.check("lastName", person_name(&self.last_name, "Last name is required"));
        let email = errors.check("email", email(&self.email).map_err(|_| "Invalid email".to_string()));
        let phone = errors.check("phone", phone(&self.phone, "Phone number is too short"));
        let username = errors.check("username", username(&self.username));
        let admin_type = errors.check(
            "type",
            AdminType::parse(&self.admin_type).ok_or_else(|| "Select a type".to_string()),
        );
        let department = errors.check("department", department(&self.department, "Select a department"));

        match (first_name, last_name, email, phone, username, admin_type, department) {
            (
                Some(first_name),
                Some(last_name),
                Some(email),
                Some(phone),
                Some(username),
                Some(admin_type),
                Some((department, dept_code)),
            ) if errors.is_empty() => Ok(AdminDraft {
                first_name,
                middle_name: self.middle_name.trim().to_string(),
                last_name,
                email,
                phone,
                username,
                admin_type,
                department,
                dept_code,
            }),
            _ => Err(errors),
        }
    }
}

impl AdminDraft {
    pub fn into_profile(self, uid: String, created_at: DateTime<Utc>) -> AdminProfile {
        AdminProfile {
            uid,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            username: self.username,
            admin_type: self.admin_type,
            department: self.department,
            dept_code: self.dept_code,
            role: Role::Admin,
            status: ProfileStatus::Active,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    pub(crate) fn valid_student() -> StudentForm {
        StudentForm {
            first_name: "Ravi".into(),
            middle_name: "".into(),
            last_name: "Kumar".into(),
            gender: "Male".into(),
            registration_no: "20017001".into(),
            phone: "9876543210".into(),
            email: "ravi.kumar@example.edu".into(),
            dob: "2002-10-15".into(),
            tenth_percentage: "85.5".into(),
            twelfth_percentage: "78".into(),
            cgpa: "8.2".into(),
            branch: "Computer Science & Engineering".into(),
            semester: "5".into(),
            backlogs: "No Backlog".into(),
        }
    }

    #[test]
    fn test_valid_student_derives_branch_code() {
        let draft = valid_student().validate(today()).unwrap();
        assert_eq!(draft.branch_code, "CS");
        assert_eq!(draft.backlogs, 0);
        assert_eq!(draft.cgpa, 8.2);
    }

    #[test]
    fn test_cgpa_and_percentage_bounds() {
        for bad in ["10.01", "-0.5", "abc", "", "NaN", "inf"] {
            assert!(cgpa(bad).is_err(), "cgpa {bad:?} should fail");
        }
        for good in ["0", "10", "7.25"] {
            assert!(cgpa(good).is_ok(), "cgpa {good:?} should pass");
        }
        for bad in ["100.1", "-1", "ninety"] {
            assert!(percentage(bad).is_err(), "percentage {bad:?} should fail");
        }
        assert_eq!(percentage(" 100 "), Ok(100.0));
    }

    #[test]
    fn test_out_of_range_student_is_rejected() {
        let mut form = valid_student();
        form.cgpa = "11".into();
        form.twelfth_percentage = "101".into();
        let errors = form.validate(today()).unwrap_err();
        assert!(errors.has_field("cgpa"));
        assert!(errors.has_field("twelfthPercentage"));
        assert!(!errors.has_field("tenthPercentage"));
    }

    #[test]
    fn test_minimum_age_boundary() {
        // exactly sixteen on the day of submission
        assert!(date_of_birth("2009-01-15", today()).is_ok());
        assert_eq!(
            date_of_birth("2009-01-16", today()),
            Err("You must be at least 16 years old".to_string())
        );
        assert!(date_of_birth("15-10-2002", today()).is_err());
    }

    #[test]
    fn test_names_need_two_characters() {
        assert!(person_name(" A ", "required").is_err());
        assert_eq!(person_name(" Al ", "required"), Ok("Al".to_string()));
    }

    #[test]
    fn test_username_rule() {
        assert!(username("asha").is_ok());
        assert!(username("asha2024").is_ok());
        assert!(username("ab").is_err());
        assert!(username("Asha").is_err());
        assert!(username("1asha").is_err());
        assert!(username("as1ha").is_err());
        assert!(username("asha_k").is_err());
        assert!(username("abcdefghijklmnopqrstu").is_err());
    }

    #[test]
    fn test_phone_length_only() {
        assert!(phone("+91 98765 43210", "short").is_ok());
        assert_eq!(phone("12345", "short"), Err("short".to_string()));
        assert!(phone("1234567890123456", "short").is_err());
    }

    #[test]
    fn test_confirmation_is_exact() {
        assert!(confirm_password("Passw0rd!", "Passw0rd!").is_ok());
        let err = confirm_password("Passw0rd!", "passw0rd!").unwrap_err();
        assert_eq!(err.field, "confirmPassword");
    }

    #[test]
    fn test_backlogs_parsing() {
        assert_eq!(parse_backlogs("No Backlog"), Some(0));
        assert_eq!(parse_backlogs("3"), Some(3));
        assert_eq!(parse_backlogs("9"), None);
        assert_eq!(parse_backlogs("two"), None);
        assert!(backlogs("").is_err());
    }

    #[test]
    fn test_recruiter_company_info_length() {
        let form = RecruiterForm {
            company_name: "Acme Analytics".into(),
            email: "hr@acme.example".into(),
            company_info: "Too short".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.errors.len(), 1);
        assert!(errors.has_field("companyInfo"));
    }

    #[test]
    fn test_admin_form_derives_dept_code() {
        let form = AdminForm {
            first_name: "Asha".into(),
            middle_name: "".into(),
            last_name: "Rao".into(),
            email: "asha@example.edu".into(),
            phone: "9876543210".into(),
            username: "asha".into(),
            admin_type: "A2".into(),
            department: "Mechanical Engineering".into(),
        };
        let draft = form.validate().unwrap();
        assert_eq!(draft.dept_code, "ME");
        assert_eq!(draft.admin_type, AdminType::A2);
    }

    #[test]
    fn test_admin_form_requires_type_and_department() {
        let form = AdminForm {
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: "asha@example.edu".into(),
            phone: "9876543210".into(),
            username: "asha".into(),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has_field("type"));
        assert!(errors.has_field("department"));
    }
}
