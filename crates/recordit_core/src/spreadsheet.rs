//! CSV spreadsheets: batch import sheets in, record and log sheets out.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{RecordError, Result};

pub const USER_COLUMNS: &[&str] = &["number", "name", "role", "remark", "password"];
pub const REPORT_COLUMNS: &[&str] = &["name", "number", "remark"];

/// A parsed import sheet: rows keyed by lower-cased header.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub rows: Vec<HashMap<String, String>>,
}

impl Sheet {
    /// Parse `bytes` and require that the header contains every name in
    /// `required`. Extra columns are ignored.
    pub fn parse(bytes: &[u8], required: &[&str]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();
        if !required.iter().all(|c| headers.iter().any(|h| h == c)) {
            return Err(RecordError::InvalidInput(missing_columns_message(required)));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let row = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            rows.push(row);
        }
        Ok(Self { rows })
    }
}

fn missing_columns_message(required: &[&str]) -> String {
    let quoted: Vec<String> = required.iter().map(|c| format!("'{c}'")).collect();
    let (last, head) = quoted.split_last().map(|(l, h)| (l.clone(), h.join(", "))).unwrap_or_default();
    format!("The spreadsheet columns should contain {head} and {last}.")
}

/// Spreadsheet tools turn long numeric ids into floats; `201612345678.0`
/// is read back as `201612345678`.
pub fn normalize_number(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(int) = raw.strip_suffix(".0") {
        if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit()) {
            return int.to_string();
        }
    }
    raw.to_string()
}

pub fn cell<'a>(row: &'a HashMap<String, String>, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("")
}

/// Serialize rows to CSV with a header line.
pub fn write_rows<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| RecordError::Internal(anyhow::anyhow!("csv flush: {e}")))
}
