//! Department/branch code map
//!
//! Fixed bijection between full department names and their short codes.
//! Student `branch`/`branchCode` and admin `department`/`deptCode` pairs are
//! always derived through this table, never entered independently.

/// (full name, short code) pairs in display order
pub const DEPARTMENTS: [(&str, &str); 7] = [
    ("Computer Science & Engineering", "CS"),
    ("Information Technology", "IT"),
    ("Electronics & Telecommunication Engineering", "EN"),
    ("Electrical Engineering", "EE"),
    ("Mechanical Engineering", "ME"),
    ("Civil Engineering", "CE"),
    ("Instrumentation Engineering", "IN"),
];

/// Short code for a full department name (exact match)
pub fn code_for(name: &str) -> Option<&'static str> {
    DEPARTMENTS
        .iter()
        .find(|(full, _)| *full == name)
        .map(|(_, code)| *code)
}

/// Full department name for a short code
pub fn name_for(code: &str) -> Option<&'static str> {
    DEPARTMENTS
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(full, _)| *full)
}

pub fn is_known_code(code: &str) -> bool {
    name_for(code).is_some()
}
