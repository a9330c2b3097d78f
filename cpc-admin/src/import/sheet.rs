//! Uploaded file -> raw rows
//!
//! CSV files are parsed directly (RFC 4180 quoting, embedded newlines
//! allowed); workbooks (.xlsx/.xls/.ods) are read through calamine and only
//! the first worksheet is used. The first row is the header; fully blank data
//! rows are dropped.

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use std::io::Cursor;
use tracing::debug;

use super::row::RawImportRow;
use super::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

impl SheetFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, ImportError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(SheetFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(SheetFormat::Workbook),
            _ => Err(ImportError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// Parse an uploaded file into header-keyed rows
pub fn parse_rows(file_name: &str, bytes: &[u8]) -> Result<Vec<RawImportRow>, ImportError> {
    let grid = match SheetFormat::from_file_name(file_name)? {
        SheetFormat::Csv => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| ImportError::Unreadable(format!("CSV is not valid UTF-8: {}", e)))?;
            parse_csv(text)
        }
        SheetFormat::Workbook => parse_workbook(bytes)?,
    };
    let rows = rows_from_grid(grid);
    debug!(file = file_name, rows = rows.len(), "Parsed upload");
    Ok(rows)
}

/// Split CSV text into records of fields
///
/// A quote only opens a quoted field as the first character of that field;
/// anywhere else in an unquoted field it is kept literally.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let chars: Vec<char> = text.chars().collect();

    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '"' && in_quotes {
            if i + 1 < chars.len() && chars[i + 1] == '"' {
                buf.push('"');
                i += 2;
            } else {
                in_quotes = false;
                i += 1;
            }
            continue;
        }
        if ch == '"' && field_start {
            in_quotes = true;
            field_start = false;
            i += 1;
            continue;
        }
        if !in_quotes && ch == ',' {
            record.push(std::mem::take(&mut buf));
            field_start = true;
            i += 1;
            continue;
        }
        if !in_quotes && (ch == '\n' || ch == '\r') {
            record.push(std::mem::take(&mut buf));
            records.push(std::mem::take(&mut record));
            field_start = true;
            // \r\n counts as one line break
            if ch == '\r' && i + 1 < chars.len() && chars[i + 1] == '\n' {
                i += 1;
            }
            i += 1;
            continue;
        }
        buf.push(ch);
        field_start = false;
        i += 1;
    }

    if !buf.is_empty() || !record.is_empty() {
        record.push(buf);
        records.push(record);
    }
    records
}

fn parse_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::Unreadable(format!("cannot open workbook: {}", e)))?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ImportError::Empty)?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| ImportError::Unreadable(format!("cannot read sheet {}: {}", first_sheet, e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Cell value as the text a user would have typed
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // phone numbers and whole marks come through as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%d-%m-%Y").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

/// Header row -> keys; every data row gets every header key
fn rows_from_grid(grid: Vec<Vec<String>>) -> Vec<RawImportRow> {
    let mut lines = grid.into_iter();
    let header: Vec<String> = match lines.next() {
        Some(h) => h.into_iter().map(|h| h.trim().to_string()).collect(),
        None => return Vec::new(),
    };

    lines
        .map(|cells| {
            let mut row = RawImportRow::new();
            for (idx, key) in header.iter().enumerate() {
                if key.is_empty() {
                    continue;
                }
                let value = cells.get(idx).cloned().unwrap_or_default();
                row.set(key.clone(), value);
            }
            row
        })
        .filter(|row| !row.is_blank())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SheetFormat::from_file_name("students.CSV").unwrap(), SheetFormat::Csv);
        assert_eq!(SheetFormat::from_file_name("batch.xlsx").unwrap(), SheetFormat::Workbook);
        assert_eq!(SheetFormat::from_file_name("old.xls").unwrap(), SheetFormat::Workbook);
        assert!(matches!(
            SheetFormat::from_file_name("notes.txt"),
            Err(ImportError::UnsupportedFormat(_))
        ));
        assert!(SheetFormat::from_file_name("noextension").is_err());
    }

    #[test]
    fn test_csv_quoting() {
        let records = parse_csv("a,\"b, c\",\"say \"\"hi\"\"\"\r\n1,\"multi\nline\",3\n");
        assert_eq!(
            records,
            vec![
                vec!["a".to_string(), "b, c".to_string(), "say \"hi\"".to_string()],
                vec!["1".to_string(), "multi\nline".to_string(), "3".to_string()],
            ]
        );
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_literal() {
        let rows = parse_rows(
            "s.csv",
            b"firstName,lastName,email\nRavi,D\"Souza,a@x.edu\nAsha,Rao,b@x.edu\n",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("lastName"), "D\"Souza");
        assert_eq!(rows[0].get("email"), "a@x.edu");
        assert_eq!(rows[1].get("firstName"), "Asha");

        let records = parse_csv("5\" tall,\"x\"y\n");
        assert_eq!(records, vec![vec!["5\" tall".to_string(), "xy".to_string()]]);
    }

    #[test]
    fn test_csv_without_trailing_newline_and_bom() {
        let records = parse_csv("\u{feff}x,y\n1,2");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0][0], "x");
        assert_eq!(records[1], vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_short_rows_fill_empty_strings() {
        let rows = parse_rows("s.csv", b"firstName,lastName,email\nRavi\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("firstName"), "Ravi");
        assert_eq!(rows[0].get("email"), "");
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let rows = parse_rows("s.csv", b"firstName,lastName\n,\nAsha,Rao\n\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("lastName"), "Rao");
    }

    #[test]
    fn test_header_only_has_no_rows() {
        assert!(parse_rows("s.csv", b"firstName,lastName\n").unwrap().is_empty());
        assert!(parse_rows("s.csv", b"").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_workbook_is_unreadable() {
        let err = parse_rows("s.xlsx", b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ImportError::Unreadable(_)));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(9876543210.0)), "9876543210");
        assert_eq!(cell_text(&Data::Float(85.5)), "85.5");
        assert_eq!(cell_text(&Data::Int(5)), "5");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
