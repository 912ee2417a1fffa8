//! Record normalization: delimited text to validated variables.

use std::path::Path;

use cohort_model::Variable;
use tracing::{debug, warn};

use crate::csv::{ColumnMap, parse_csv_line, split_records};
use crate::error::{IngestError, Result};

pub const DEFAULT_VARIABLE_NAME: &str = "Unnamed";
pub const DEFAULT_DESCRIPTION: &str = "No description";
pub const DEFAULT_VALUES: &str = "N/A";
pub const DEFAULT_TABLE: &str = "Default";
pub const DEFAULT_DATATYPE: &str = "String";

/// Normalizes one file's text into variables belonging to `cohort_name`.
///
/// Rows are parsed independently; a short or malformed row yields defaulted
/// fields rather than failing the file. The file fails as a whole only when
/// it is empty, has no data rows, or lacks a resolvable name or table column.
pub fn normalize(text: &str, cohort_name: &str) -> Result<Vec<Variable>> {
    normalize_records(text, cohort_name, false)
}

/// Normalizes a previously exported selection.
///
/// Same rules as [`normalize`], except that a `cohort_name` column, when
/// present and non-empty, supplies each row's cohort. Rows without one fall
/// back to `fallback_cohort`.
pub fn normalize_export(text: &str, fallback_cohort: &str) -> Result<Vec<Variable>> {
    normalize_records(text, fallback_cohort, true)
}

fn normalize_records(text: &str, cohort_name: &str, cohort_from_rows: bool) -> Result<Vec<Variable>> {
    let records = split_records(text);
    let Some((header, rows)) = records.split_first() else {
        return Err(IngestError::EmptyFile {
            file: cohort_name.to_string(),
        });
    };

    let columns = ColumnMap::detect(&parse_csv_line(header)).map_err(|missing| {
        warn!(cohort = %cohort_name, ?missing, "required columns missing");
        IngestError::MissingColumns {
            file: cohort_name.to_string(),
            missing,
        }
    })?;

    if rows.is_empty() {
        return Err(IngestError::NoDataRows {
            file: cohort_name.to_string(),
        });
    }

    let cohort_column = if cohort_from_rows { columns.cohort } else { None };
    let variables: Vec<Variable> = rows
        .iter()
        .map(|row| {
            let fields = parse_csv_line(row);
            let cohort = field(&fields, cohort_column).unwrap_or(cohort_name);
            build_variable(&fields, &columns, cohort)
        })
        .collect();

    debug!(
        cohort = %cohort_name,
        variables = variables.len(),
        "normalized metadata file"
    );
    Ok(variables)
}

fn build_variable(fields: &[String], columns: &ColumnMap, cohort_name: &str) -> Variable {
    Variable {
        variable_name: text_or(fields, Some(columns.name), DEFAULT_VARIABLE_NAME),
        variable_description: text_or(fields, columns.description, DEFAULT_DESCRIPTION),
        values: text_or(fields, columns.values, DEFAULT_VALUES),
        completeness: field(fields, columns.completeness).map_or(0.0, parse_completeness),
        table_name: text_or(fields, Some(columns.table), DEFAULT_TABLE),
        datatype: text_or(fields, columns.datatype, DEFAULT_DATATYPE),
        cohort_name: cohort_name.to_string(),
    }
}

fn text_or(fields: &[String], idx: Option<usize>, default: &str) -> String {
    field(fields, idx).unwrap_or(default).to_string()
}

/// Returns the non-empty field at `idx`, if any.
fn field(fields: &[String], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| fields.get(i))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Parses completeness from the leading numeric prefix of `raw`.
///
/// `"95%"` parses as `95`; anything without a numeric prefix, or a
/// non-finite value, is `0`.
pub fn parse_completeness(raw: &str) -> f64 {
    let trimmed = raw.trim_start();
    let end = numeric_prefix_len(trimmed.as_bytes());
    trimmed[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Length of the longest `[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?` prefix.
fn numeric_prefix_len(bytes: &[u8]) -> usize {
    let mut pos = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }
    let int_start = pos;
    while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
    }
    let mut digits = pos - int_start;
    if bytes.get(pos) == Some(&b'.') {
        let frac_start = pos + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            pos = frac_end;
        }
    }
    if digits == 0 {
        return 0;
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits_start = exp;
        while bytes.get(exp).is_some_and(u8::is_ascii_digit) {
            exp += 1;
        }
        if exp > exp_digits_start {
            pos = exp;
        }
    }
    pos
}

/// Derives a cohort name from a file name by dropping a trailing `.csv`.
pub fn cohort_name_from_file(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name);
    let split = base.len().saturating_sub(4);
    match base.get(split..) {
        Some(ext) if base.len() > 4 && ext.eq_ignore_ascii_case(".csv") => base[..split].to_string(),
        _ => base.to_string(),
    }
}
