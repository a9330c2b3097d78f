//! Student list CSV export

use cpc_common::models::{Stored, StudentProfile};

pub const EXPORT_FILE_NAME: &str = "students.csv";

/// Fixed column order of the export header
pub const EXPORT_COLUMNS: [&str; 14] = [
    "registrationNo",
    "firstName",
    "middleName",
    "lastName",
    "email",
    "phone",
    "gender",
    "dob",
    "tenthPercentage",
    "twelfthPercentage",
    "cgpa",
    "backlogs",
    "branch",
    "branchCode",
];

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn export_row(student: &StudentProfile) -> [String; 14] {
    [
        student.registration_no.clone(),
        student.first_name.clone(),
        student.middle_name.clone(),
        student.last_name.clone(),
        student.email.clone(),
        student.phone.clone(),
        student.gender.clone(),
        student.dob.clone(),
        format_number(student.tenth_percentage),
        format_number(student.twelfth_percentage),
        format_number(student.cgpa),
        student.backlogs.to_string(),
        student.branch.clone(),
        student.branch_code.clone(),
    ]
}

/// Header row plus one line per student, in listing order
pub fn students_csv(students: &[Stored<StudentProfile>]) -> String {
    let mut out = EXPORT_COLUMNS.join(",");
    out.push('\n');
    for student in students {
        let line: Vec<String> = export_row(&student.data).iter().map(|v| csv_quote(v)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}
