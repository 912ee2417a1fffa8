//! Export serialization.

use cohort_model::Variable;

/// Fixed header row of exported selections.
pub const EXPORT_HEADER: &str =
    "variable_name,variable_description,values,completeness,table_name,cohort_name";

/// Default file name for an exported selection.
pub const EXPORT_FILE_NAME: &str = "selected_variables.csv";

/// Serializes variables in the export layout, one row per variable.
///
/// String fields are always quoted with embedded quotes doubled, and any
/// line break inside a field is written as a single space so that each row
/// stays on one line. Completeness is written unquoted. Rows are separated
/// by `\n` with no trailing newline after the last row.
pub fn write_variables<'a>(variables: impl IntoIterator<Item = &'a Variable>) -> String {
    let rows: Vec<String> = variables.into_iter().map(export_row).collect();
    let mut out = String::with_capacity(EXPORT_HEADER.len() + 1 + rows.len() * 64);
    out.push_str(EXPORT_HEADER);
    out.push('\n');
    out.push_str(&rows.join("\n"));
    out
}

fn export_row(variable: &Variable) -> String {
    format!(
        "{},{},{},{},{},{}",
        quote(&variable.variable_name),
        quote(&variable.variable_description),
        quote(&variable.values),
        variable.completeness,
        quote(&variable.table_name),
        quote(&variable.cohort_name),
    )
}

fn quote(value: &str) -> String {
    let single_line = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!("\"{}\"", single_line.replace('"', "\"\""))
}
