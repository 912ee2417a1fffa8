//! Record splitting for delimited text.

/// Splits raw text into records, one per line.
///
/// Quotes never carry over a line break, so an unbalanced quote in one row
/// cannot absorb the rows after it. A leading BOM and trailing `\r` are
/// removed, and blank lines are skipped.
pub fn split_records(text: &str) -> Vec<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect()
}
