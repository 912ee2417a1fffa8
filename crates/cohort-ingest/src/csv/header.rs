//! Header resolution and field parsing.

/// Header synonyms for the variable name, in priority order.
const NAME_SYNONYMS: [&str; 2] = ["var_name", "variable_name"];
/// Header synonyms for the description.
const DESCRIPTION_SYNONYMS: [&str; 3] = ["var_label", "variable_description", "description"];
/// Header synonyms for the enumerated values.
const VALUES_SYNONYMS: [&str; 1] = ["values"];
/// Header synonyms for completeness.
const COMPLETENESS_SYNONYMS: [&str; 1] = ["completeness"];
/// Header synonyms for the table name.
const TABLE_SYNONYMS: [&str; 3] = ["filename", "table_name", "table"];
/// Header synonyms for the datatype.
const DATATYPE_SYNONYMS: [&str; 3] = ["data_type", "datatype", "type"];
/// Exact header carrying the cohort in exported files.
const COHORT_HEADER: &str = "cohort_name";

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: usize,
    pub table: usize,
    pub description: Option<usize>,
    pub values: Option<usize>,
    pub completeness: Option<usize>,
    pub datatype: Option<usize>,
    /// Only present in exported files; ignored by plain normalization.
    pub cohort: Option<usize>,
}

impl ColumnMap {
    /// Resolves column positions from header fields.
    ///
    /// Matching is case-insensitive by substring. For each logical field the
    /// synonyms are tried in order and the first header containing one wins.
    /// Returns the missing required columns when the name or table column
    /// cannot be resolved.
    pub fn detect(headers: &[String]) -> Result<Self, Vec<&'static str>> {
        let headers: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();

        let name = find_column(&headers, &NAME_SYNONYMS);
        let table = find_column(&headers, &TABLE_SYNONYMS);

        let (name, table) = match (name, table) {
            (Some(name), Some(table)) => (name, table),
            (name, table) => {
                let mut missing = Vec::new();
                if name.is_none() {
                    missing.push(NAME_SYNONYMS[0]);
                }
                if table.is_none() {
                    missing.push(TABLE_SYNONYMS[0]);
                }
                return Err(missing);
            }
        };

        Ok(Self {
            name,
            table,
            description: find_column(&headers, &DESCRIPTION_SYNONYMS),
            values: find_column(&headers, &VALUES_SYNONYMS),
            completeness: find_column(&headers, &COMPLETENESS_SYNONYMS),
            datatype: find_column(&headers, &DATATYPE_SYNONYMS),
            cohort: headers.iter().position(|h| h == COHORT_HEADER),
        })
    }
}

fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    synonyms
        .iter()
        .find_map(|synonym| headers.iter().position(|h| h.contains(synonym)))
}

/// Normalizes a field value by trimming whitespace.
fn normalize_field(value: &str) -> String {
    value.trim().to_string()
}

/// Parses a CSV line into fields, handling quoted values.
///
/// A comma only separates fields outside quotes. Enclosing quotes are
/// stripped and a doubled quote inside a quoted field yields one literal
/// quote. Fields are trimmed.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => {
                in_quotes = true;
            }
            '"' if in_quotes => {
                // Check for escaped quote ("")
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            ',' if !in_quotes => {
                fields.push(normalize_field(&current));
                current.clear();
            }
            _ => {
                current.push(c);
            }
        }
    }

    fields.push(normalize_field(&current));
    fields
}
